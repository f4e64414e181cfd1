//! 命令注册与执行门
//!
//! 注册表管理完整命令、快捷键与别名的映射；执行门串行化
//! 命令执行，同一时间只允许一个命令运行，空名称重复上一
//! 命令，未知命令报告后按失败处理。

use crate::commands;
use crate::events::{EventHub, WorkspaceEvent};
use crate::workspace::Workspace;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

/// 命令种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    DrawLine,
    DrawCircle,
    DrawPoint,
    Erase,
    ZoomWindow,
}

impl CommandKind {
    /// 命令的规范名称
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::DrawLine => "LINE",
            CommandKind::DrawCircle => "CIRCLE",
            CommandKind::DrawPoint => "POINT",
            CommandKind::Erase => "ERASE",
            CommandKind::ZoomWindow => "ZOOM",
        }
    }
}

/// 命令无法开始执行的原因
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("未知命令: {0}")]
    UnknownCommand(String),
    #[error("没有可重复的命令")]
    NothingToRepeat,
}

// ========== 命令注册表 ==========

/// 命令注册表
///
/// 管理所有命令、快捷键和别名的映射
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    /// 完整命令 -> CommandKind
    main_commands: HashMap<String, CommandKind>,
    /// 快捷键/短命令 -> CommandKind
    short_commands: HashMap<String, CommandKind>,
    /// 用户别名 -> 完整命令
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    /// 创建新的命令注册表
    pub fn new() -> Self {
        let mut registry = Self {
            main_commands: HashMap::new(),
            short_commands: HashMap::new(),
            aliases: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    /// 注册默认命令
    fn register_defaults(&mut self) {
        // 绘图命令
        self.register(CommandKind::DrawLine, "LINE", &["L"]);
        self.register(CommandKind::DrawCircle, "CIRCLE", &["C"]);
        self.register(CommandKind::DrawPoint, "POINT", &["PO", "."]);

        // 修改命令
        self.register(CommandKind::Erase, "ERASE", &["E", "DELETE"]);

        // 视图命令
        self.register(CommandKind::ZoomWindow, "ZOOM", &["Z", "ZW"]);
    }

    /// 注册命令
    ///
    /// # 参数
    /// - `kind`: 命令种类
    /// - `full_cmd`: 完整命令名（如 "LINE"）
    /// - `shortcuts`: 快捷键/短命令列表（如 ["L"]）
    pub fn register(&mut self, kind: CommandKind, full_cmd: &str, shortcuts: &[&str]) {
        let full_cmd_upper = full_cmd.to_uppercase();
        self.main_commands.insert(full_cmd_upper, kind);

        for shortcut in shortcuts {
            let shortcut_upper = shortcut.to_uppercase();
            self.short_commands.insert(shortcut_upper, kind);
        }
    }

    /// 查找命令对应的种类
    pub fn lookup(&self, input: &str) -> Option<CommandKind> {
        let input_upper = input.to_uppercase();

        // 1. 先查完整命令
        if let Some(&kind) = self.main_commands.get(&input_upper) {
            return Some(kind);
        }

        // 2. 再查快捷键
        if let Some(&kind) = self.short_commands.get(&input_upper) {
            return Some(kind);
        }

        // 3. 查别名
        if let Some(cmd) = self.aliases.get(&input_upper) {
            return self.main_commands.get(cmd).copied();
        }

        None
    }

    /// Tab 补全
    ///
    /// 返回所有以 prefix 开头的命令
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let prefix_upper = prefix.to_uppercase();
        let mut results: Vec<String> = self
            .main_commands
            .keys()
            .filter(|cmd| cmd.starts_with(&prefix_upper))
            .cloned()
            .collect();

        results.sort();
        results
    }

    /// 添加用户别名
    pub fn add_alias(&mut self, alias: &str, command: &str) {
        let alias_upper = alias.to_uppercase();
        let command_upper = command.to_uppercase();

        // 不允许覆盖现有命令
        if self.main_commands.contains_key(&alias_upper) {
            return;
        }

        // 确保目标命令存在
        if self.main_commands.contains_key(&command_upper) {
            self.aliases.insert(alias_upper, command_upper);
        }
    }

    /// 移除别名
    pub fn remove_alias(&mut self, alias: &str) {
        let alias_upper = alias.to_uppercase();
        self.aliases.remove(&alias_upper);
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 执行门 ==========

/// 命令执行门
pub struct CommandGate {
    /// 互斥标志：同一时间只允许一个命令
    executing: AtomicBool,
    /// 最近一次成功解析的命令名（回车重复用）
    last_command: Mutex<Option<String>>,
    registry: CommandRegistry,
    hub: Arc<EventHub>,
}

impl CommandGate {
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self {
            executing: AtomicBool::new(false),
            last_command: Mutex::new(None),
            registry: CommandRegistry::new(),
            hub,
        }
    }

    /// 是否有命令正在执行
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// 最近一次执行的命令名
    pub fn last_command(&self) -> Option<String> {
        let last = self.last_command.lock().unwrap_or_else(|e| e.into_inner());
        last.clone()
    }

    /// 命令注册表
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// 执行命令；空名称重复上一命令
    ///
    /// 返回命令是否提交了结果。未知命令报告后按失败返回；
    /// 已有命令在执行时本次调用被拒绝，无任何副作用。
    pub async fn execute(&self, workspace: &Arc<Workspace>, name: Option<&str>) -> bool {
        let kind = match self.resolve(name) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "命令未执行");
                self.hub
                    .publish(WorkspaceEvent::OutputMessage { text: e.to_string() });
                return false;
            }
        };

        if self.executing.swap(true, Ordering::SeqCst) {
            warn!(command = kind.name(), "已有命令在执行，忽略");
            return false;
        }
        {
            let mut last = self.last_command.lock().unwrap_or_else(|e| e.into_inner());
            *last = Some(kind.name().to_string());
        }
        info!(command = kind.name(), "命令开始");
        self.hub.publish(WorkspaceEvent::CommandStarted {
            name: kind.name().to_string(),
        });

        let committed = match kind {
            CommandKind::DrawLine => commands::draw_line::run(workspace).await,
            CommandKind::DrawCircle => commands::draw_circle::run(workspace).await,
            CommandKind::DrawPoint => commands::draw_point::run(workspace).await,
            CommandKind::Erase => commands::erase::run(workspace).await,
            CommandKind::ZoomWindow => commands::zoom_window::run(workspace).await,
        };

        // 命令结束：清除正交/角度捕捉的基准点并释放互斥
        workspace.broker().clear_last_point();
        self.executing.store(false, Ordering::SeqCst);
        info!(command = kind.name(), committed, "命令结束");
        self.hub.publish(WorkspaceEvent::CommandEnded {
            name: kind.name().to_string(),
            committed,
        });
        committed
    }

    /// 把请求名解析为命令种类；空名称取上一命令
    fn resolve(&self, name: Option<&str>) -> Result<CommandKind, CommandError> {
        let requested = match name {
            Some(n) => n.trim().to_string(),
            None => {
                let last = self.last_command.lock().unwrap_or_else(|e| e.into_inner());
                last.clone().ok_or(CommandError::NothingToRepeat)?
            }
        };
        self.registry
            .lookup(&requested)
            .ok_or(CommandError::UnknownCommand(requested))
    }
}

// ========== 测试 ==========

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = CommandRegistry::new();

        // 完整命令
        assert_eq!(registry.lookup("LINE"), Some(CommandKind::DrawLine));
        assert_eq!(registry.lookup("line"), Some(CommandKind::DrawLine));

        // 快捷键
        assert_eq!(registry.lookup("L"), Some(CommandKind::DrawLine));
        assert_eq!(registry.lookup("e"), Some(CommandKind::Erase));

        // 不存在的命令
        assert_eq!(registry.lookup("NOTEXIST"), None);
    }

    #[test]
    fn test_complete() {
        let registry = CommandRegistry::new();

        let completions = registry.complete("L");
        assert!(completions.contains(&"LINE".to_string()));

        let completions = registry.complete("Z");
        assert!(completions.contains(&"ZOOM".to_string()));
    }

    #[test]
    fn test_alias() {
        let mut registry = CommandRegistry::new();

        registry.add_alias("LL", "LINE");
        assert_eq!(registry.lookup("LL"), Some(CommandKind::DrawLine));

        registry.remove_alias("LL");
        assert_eq!(registry.lookup("LL"), None);

        // 别名不允许覆盖现有命令
        registry.add_alias("CIRCLE", "LINE");
        assert_eq!(registry.lookup("CIRCLE"), Some(CommandKind::DrawCircle));
    }

    #[test]
    fn test_gate_initial_state() {
        let gate = CommandGate::new(Arc::new(EventHub::new()));
        assert!(!gate.is_executing());
        assert_eq!(gate.last_command(), None);
    }

    #[test]
    fn test_resolve_errors() {
        let gate = CommandGate::new(Arc::new(EventHub::new()));

        // 空名称且无上一命令
        assert!(matches!(
            gate.resolve(None),
            Err(CommandError::NothingToRepeat)
        ));
        // 未知命令
        assert!(matches!(
            gate.resolve(Some("BOGUS")),
            Err(CommandError::UnknownCommand(_))
        ));
        // 合法命令
        assert!(matches!(gate.resolve(Some("zoom")), Ok(CommandKind::ZoomWindow)));
    }
}

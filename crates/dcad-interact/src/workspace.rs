//! 工作区
//!
//! 组合文档、设置、事件总线、输入协调器、捕捉点索引、
//! 执行门与显示交互引擎，是宿主 UI 的唯一装配入口。
//! 文档更新采用克隆替换：持有旧快照的渲染线程不受影响，
//! 每次替换触发一次后台捕捉点索引重建。

use crate::command::CommandGate;
use crate::display::{InteractionEngine, MouseButton};
use crate::events::{EventHub, WorkspaceEvent};
use crate::input::InputBroker;
use crate::snap_index::SnapPointIndex;
use crate::viewport::{TransformError, ViewPort};
use dcad_core::drawing::Drawing;
use dcad_core::settings::WorkspaceSettings;
use futures::channel::mpsc;
use futures::StreamExt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// 交互工作区
pub struct Workspace {
    drawing: Arc<RwLock<Arc<Drawing>>>,
    settings: Arc<RwLock<WorkspaceSettings>>,
    hub: Arc<EventHub>,
    broker: Arc<InputBroker>,
    index: Arc<SnapPointIndex>,
    gate: Arc<CommandGate>,
    engine: Arc<InteractionEngine>,
}

impl Workspace {
    /// 以空文档创建工作区
    ///
    /// 必须在 tokio 运行时内调用：命令执行与索引重建
    /// 都经由 `tokio::spawn` 派发。
    pub fn new() -> Result<Arc<Self>, TransformError> {
        Self::with_drawing(Drawing::new())
    }

    /// 以给定文档创建工作区
    pub fn with_drawing(drawing: Drawing) -> Result<Arc<Self>, TransformError> {
        let hub = Arc::new(EventHub::new());
        let broker = Arc::new(InputBroker::new(Arc::clone(&hub)));
        let index = Arc::new(SnapPointIndex::new());
        let gate = Arc::new(CommandGate::new(Arc::clone(&hub)));
        let drawing = Arc::new(RwLock::new(Arc::new(drawing)));
        let settings = Arc::new(RwLock::new(WorkspaceSettings::default()));
        let engine = Arc::new(InteractionEngine::new(
            Arc::clone(&broker),
            Arc::clone(&index),
            Arc::clone(&hub),
            Arc::clone(&gate),
            Arc::clone(&drawing),
            Arc::clone(&settings),
        )?);

        let workspace = Arc::new(Self {
            drawing,
            settings,
            hub,
            broker,
            index,
            gate,
            engine,
        });

        // 命令名经由协调器回流到执行门
        let weak = Arc::downgrade(&workspace);
        workspace.broker.set_command_sink(Box::new(move |name| {
            let Some(ws) = weak.upgrade() else {
                return;
            };
            tokio::spawn(async move {
                ws.gate.execute(&ws, name.as_deref()).await;
            });
        }));

        // 输入请求切换时清理上一请求遗留的瞬态交互状态
        let weak = Arc::downgrade(&workspace);
        let mut events = workspace.hub.subscribe("workspace-pump");
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let Some(ws) = weak.upgrade() else {
                    break;
                };
                if matches!(
                    event,
                    WorkspaceEvent::ValueRequested { .. } | WorkspaceEvent::ValueReceived
                ) {
                    ws.engine.reset_transient_interaction();
                }
            }
            debug!("工作区事件泵退出");
        });

        // 初始文档也建立索引世代基线
        workspace
            .index
            .begin_rebuild(workspace.drawing(), workspace.engine.snapshot());

        Ok(workspace)
    }

    // ---------- 组件访问 ----------

    pub fn broker(&self) -> &InputBroker {
        &self.broker
    }

    pub fn engine(&self) -> &InteractionEngine {
        &self.engine
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn gate(&self) -> &CommandGate {
        &self.gate
    }

    /// 订阅工作区事件
    pub fn events(
        &self,
        subscriber_id: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<WorkspaceEvent> {
        self.hub.subscribe(subscriber_id)
    }

    // ---------- 文档与设置 ----------

    /// 当前文档快照
    pub fn drawing(&self) -> Arc<Drawing> {
        let guard = self.drawing.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// 修改文档
    ///
    /// 克隆当前文档、应用修改、原子替换，然后广播变更
    /// 并触发捕捉点索引的后台重建。
    pub fn update_drawing(&self, mutate: impl FnOnce(&mut Drawing)) {
        let updated = {
            let mut slot = self.drawing.write().unwrap_or_else(|e| e.into_inner());
            let mut drawing = (**slot).clone();
            mutate(&mut drawing);
            let updated = Arc::new(drawing);
            *slot = Arc::clone(&updated);
            updated
        };
        self.hub.publish(WorkspaceEvent::DrawingChanged);
        self.index.begin_rebuild(updated, self.engine.snapshot());
        // 被删除的实体不能留在持久选择集里
        self.engine.prune_selection();
    }

    /// 当前设置快照
    pub fn settings(&self) -> WorkspaceSettings {
        let guard = self.settings.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// 修改设置
    pub fn update_settings(&self, mutate: impl FnOnce(&mut WorkspaceSettings)) {
        {
            let mut guard = self.settings.write().unwrap_or_else(|e| e.into_inner());
            mutate(&mut guard);
        }
        self.engine.publish_cursor_state();
    }

    // ---------- 命令 ----------

    /// 执行命令；`None` 重复上一命令
    pub async fn execute_command(self: &Arc<Self>, name: Option<&str>) -> bool {
        self.gate.execute(self, name).await
    }

    // ---------- 交互入口（宿主 UI 转发） ----------

    pub fn resize(&self, width: f64, height: f64) -> Result<(), TransformError> {
        self.engine.resize(width, height)
    }

    pub fn mouse_move(&self, x: f64, y: f64) {
        self.engine.mouse_move(x, y);
    }

    pub fn mouse_down(&self, x: f64, y: f64, button: MouseButton) {
        self.engine.mouse_down(x, y, button);
    }

    pub fn mouse_up(&self, x: f64, y: f64, button: MouseButton) {
        self.engine.mouse_up(x, y, button);
    }

    pub fn mouse_wheel(&self, x: f64, y: f64, delta: f64) {
        self.engine.mouse_wheel(x, y, delta);
    }

    pub fn pan(&self, dx: f64, dy: f64) {
        self.engine.pan(dx, dy);
    }

    /// 命令行文本输入
    pub fn submit_input(&self, text: &str) {
        self.engine.submit_input(text);
    }

    /// Esc：取消挂起请求与瞬态交互
    pub fn cancel(&self) {
        self.engine.cancel_interaction();
    }

    /// 当前视口
    pub fn viewport(&self) -> ViewPort {
        self.engine.viewport()
    }
}

// ========== 测试 ==========

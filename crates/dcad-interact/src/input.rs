//! 输入协调器
//!
//! 命令以直线式协程编写：请求一个值（点/实体/距离/文本），
//! 在 oneshot 通道上挂起，等 UI 线程推入值后恢复。
//! 协调器负责：
//! - 维护当前允许的输入类别集合
//! - 校验推入值的类别并拒绝不匹配的推入
//! - 保证每个请求恰好收到一个结果（值/选项/取消/空）
//! - 持有当前命令提供的橡皮筋生成器与最近落点

use crate::events::{EventHub, WorkspaceEvent};
use crate::hit_test::SelectedEntity;
use dcad_core::entity::Entity;
use dcad_core::geometry::Primitive;
use dcad_core::math::Point3;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// 橡皮筋生成器：由当前命令提供，把解析后的世界坐标
/// 映射为预览图元
pub type RubberBandGenerator = dyn Fn(&Point3) -> Vec<Primitive> + Send + Sync;

// ========== 输入类别 ==========

/// 输入类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// 空输入（回车/右键确认）
    None,
    /// 命令名
    Command,
    /// 选项关键字
    Directive,
    /// 点
    Point,
    /// 单个实体
    Entity,
    /// 实体集合
    Entities,
    /// 距离
    Distance,
    /// 自由文本
    Text,
}

impl InputKind {
    /// 获取类别的中文名称
    pub fn name(&self) -> &'static str {
        match self {
            InputKind::None => "空输入",
            InputKind::Command => "命令",
            InputKind::Directive => "选项",
            InputKind::Point => "点",
            InputKind::Entity => "实体",
            InputKind::Entities => "实体集",
            InputKind::Distance => "距离",
            InputKind::Text => "文本",
        }
    }
}

/// 输入类别掩码（位域，用于快速判断某类输入当前是否被接受）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputKindSet {
    bits: u16,
}

impl InputKindSet {
    pub const NONE_INPUT: u16 = 1 << 0;
    pub const COMMAND: u16 = 1 << 1;
    pub const DIRECTIVE: u16 = 1 << 2;
    pub const POINT: u16 = 1 << 3;
    pub const ENTITY: u16 = 1 << 4;
    pub const ENTITIES: u16 = 1 << 5;
    pub const DISTANCE: u16 = 1 << 6;
    pub const TEXT: u16 = 1 << 7;

    /// 单一类别
    pub fn single(kind: InputKind) -> Self {
        Self { bits: bit(kind) }
    }

    /// 空闲状态：只接受命令名
    pub fn idle() -> Self {
        Self::single(InputKind::Command)
    }

    pub fn contains(&self, kind: InputKind) -> bool {
        self.bits & bit(kind) != 0
    }

    pub fn insert(&mut self, kind: InputKind) {
        self.bits |= bit(kind);
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

fn bit(kind: InputKind) -> u16 {
    match kind {
        InputKind::None => InputKindSet::NONE_INPUT,
        InputKind::Command => InputKindSet::COMMAND,
        InputKind::Directive => InputKindSet::DIRECTIVE,
        InputKind::Point => InputKindSet::POINT,
        InputKind::Entity => InputKindSet::ENTITY,
        InputKind::Entities => InputKindSet::ENTITIES,
        InputKind::Distance => InputKindSet::DISTANCE,
        InputKind::Text => InputKindSet::TEXT,
    }
}

impl fmt::Display for InputKindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all = [
            InputKind::None,
            InputKind::Command,
            InputKind::Directive,
            InputKind::Point,
            InputKind::Entity,
            InputKind::Entities,
            InputKind::Distance,
            InputKind::Text,
        ];
        let names: Vec<&str> = all
            .iter()
            .filter(|k| self.contains(**k))
            .map(|k| k.name())
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

// ========== 请求与结果 ==========

/// 提示与可用选项
///
/// 选项关键字不区分大小写，存储时统一为小写。
#[derive(Debug, Clone)]
pub struct UserDirective {
    pub prompt: String,
    pub tokens: Vec<String>,
}

impl UserDirective {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tokens: Vec::new(),
        }
    }

    pub fn with_tokens(prompt: impl Into<String>, tokens: &[&str]) -> Self {
        Self {
            prompt: prompt.into(),
            tokens: tokens.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// 关键字是否是本提示的合法选项
    pub fn accepts(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t.eq_ignore_ascii_case(token))
    }
}

/// 输入请求的结果
///
/// 每个请求恰好收到一个结果。
#[derive(Debug, Clone, PartialEq)]
pub enum InputRequestResult<T> {
    /// 请求类别的值
    Value(T),
    /// 命令选项关键字（小写）
    Directive(String),
    /// 请求被取消
    Cancel,
    /// 空输入（回车/右键）
    None,
}

impl<T> InputRequestResult<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, InputRequestResult::Value(_))
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, InputRequestResult::Cancel)
    }

    pub fn value(self) -> Option<T> {
        match self {
            InputRequestResult::Value(v) => Some(v),
            _ => None,
        }
    }

    /// 取出值；标签不是 `Value` 时 panic
    pub fn unwrap_value(self) -> T {
        match self {
            InputRequestResult::Value(v) => v,
            other => panic!("结果不是值: {}", other.tag_name()),
        }
    }

    pub fn directive(&self) -> Option<&str> {
        match self {
            InputRequestResult::Directive(d) => Some(d),
            _ => None,
        }
    }

    fn tag_name(&self) -> &'static str {
        match self {
            InputRequestResult::Value(_) => "Value",
            InputRequestResult::Directive(_) => "Directive",
            InputRequestResult::Cancel => "Cancel",
            InputRequestResult::None => "None",
        }
    }
}

/// 挂起中的请求应答端，按请求类别持有对应的通道
enum PendingResponder {
    Point(oneshot::Sender<InputRequestResult<Point3>>),
    Entity(oneshot::Sender<InputRequestResult<SelectedEntity>>),
    Entities(oneshot::Sender<InputRequestResult<Vec<Entity>>>),
    Distance(oneshot::Sender<InputRequestResult<f64>>),
    Text(oneshot::Sender<InputRequestResult<String>>),
    None(oneshot::Sender<InputRequestResult<()>>),
}

impl PendingResponder {
    fn kind(&self) -> InputKind {
        match self {
            PendingResponder::Point(_) => InputKind::Point,
            PendingResponder::Entity(_) => InputKind::Entity,
            PendingResponder::Entities(_) => InputKind::Entities,
            PendingResponder::Distance(_) => InputKind::Distance,
            PendingResponder::Text(_) => InputKind::Text,
            PendingResponder::None(_) => InputKind::None,
        }
    }

    /// 以取消结束请求
    fn cancel(self) {
        match self {
            PendingResponder::Point(tx) => drop(tx.send(InputRequestResult::Cancel)),
            PendingResponder::Entity(tx) => drop(tx.send(InputRequestResult::Cancel)),
            PendingResponder::Entities(tx) => drop(tx.send(InputRequestResult::Cancel)),
            PendingResponder::Distance(tx) => drop(tx.send(InputRequestResult::Cancel)),
            PendingResponder::Text(tx) => drop(tx.send(InputRequestResult::Cancel)),
            PendingResponder::None(tx) => drop(tx.send(InputRequestResult::Cancel)),
        }
    }

    /// 以空输入结束请求
    fn none(self) {
        match self {
            PendingResponder::Point(tx) => drop(tx.send(InputRequestResult::None)),
            PendingResponder::Entity(tx) => drop(tx.send(InputRequestResult::None)),
            PendingResponder::Entities(tx) => drop(tx.send(InputRequestResult::None)),
            PendingResponder::Distance(tx) => drop(tx.send(InputRequestResult::None)),
            PendingResponder::Text(tx) => drop(tx.send(InputRequestResult::None)),
            PendingResponder::None(tx) => drop(tx.send(InputRequestResult::None)),
        }
    }

    /// 以选项关键字结束请求
    fn directive(self, token: String) {
        match self {
            PendingResponder::Point(tx) => drop(tx.send(InputRequestResult::Directive(token))),
            PendingResponder::Entity(tx) => drop(tx.send(InputRequestResult::Directive(token))),
            PendingResponder::Entities(tx) => drop(tx.send(InputRequestResult::Directive(token))),
            PendingResponder::Distance(tx) => drop(tx.send(InputRequestResult::Directive(token))),
            PendingResponder::Text(tx) => drop(tx.send(InputRequestResult::Directive(token))),
            PendingResponder::None(tx) => drop(tx.send(InputRequestResult::Directive(token))),
        }
    }
}

// ========== 协调器 ==========

struct BrokerState {
    allowed: InputKindSet,
    directive_tokens: Vec<String>,
    pending: Option<PendingResponder>,
    /// 实体集请求的累积选择
    gathered_entities: Vec<Entity>,
    rubber_band: Option<Arc<RubberBandGenerator>>,
    last_point: Option<Point3>,
}

impl BrokerState {
    fn new() -> Self {
        Self {
            allowed: InputKindSet::idle(),
            directive_tokens: Vec::new(),
            pending: None,
            gathered_entities: Vec::new(),
            rubber_band: None,
            last_point: None,
        }
    }

    /// 取出未决请求并恢复空闲状态；返回应答端
    fn finish(&mut self) -> Option<PendingResponder> {
        let pending = self.pending.take();
        self.allowed = InputKindSet::idle();
        self.directive_tokens.clear();
        self.rubber_band = None;
        self.gathered_entities.clear();
        pending
    }
}

/// 命令派发回调：空名称表示重复上一命令
pub type CommandSink = dyn Fn(Option<String>) + Send + Sync;

/// 输入协调器
pub struct InputBroker {
    state: Mutex<BrokerState>,
    hub: Arc<EventHub>,
    command_sink: Mutex<Option<Box<CommandSink>>>,
}

impl InputBroker {
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self {
            state: Mutex::new(BrokerState::new()),
            hub,
            command_sink: Mutex::new(None),
        }
    }

    /// 安装命令派发回调（由工作区装配时调用一次）
    pub fn set_command_sink(&self, sink: Box<CommandSink>) {
        let mut slot = self.command_sink.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(sink);
    }

    // ---------- 请求端（命令协程调用） ----------

    /// 请求一个点
    pub async fn get_point(
        &self,
        directive: UserDirective,
        preview: Option<Arc<RubberBandGenerator>>,
    ) -> InputRequestResult<Point3> {
        let (tx, rx) = oneshot::channel();
        self.install(&directive, PendingResponder::Point(tx), preview);
        rx.await.unwrap_or(InputRequestResult::Cancel)
    }

    /// 请求一个实体
    pub async fn get_entity(&self, directive: UserDirective) -> InputRequestResult<SelectedEntity> {
        let (tx, rx) = oneshot::channel();
        self.install(&directive, PendingResponder::Entity(tx), None);
        rx.await.unwrap_or(InputRequestResult::Cancel)
    }

    /// 请求一组实体
    ///
    /// 选择在请求挂起期间持续累积，空输入（回车/右键）提交整组。
    pub async fn get_entities(&self, directive: UserDirective) -> InputRequestResult<Vec<Entity>> {
        let (tx, rx) = oneshot::channel();
        self.install(&directive, PendingResponder::Entities(tx), None);
        rx.await.unwrap_or(InputRequestResult::Cancel)
    }

    /// 请求一个距离
    pub async fn get_distance(
        &self,
        directive: UserDirective,
        preview: Option<Arc<RubberBandGenerator>>,
    ) -> InputRequestResult<f64> {
        let (tx, rx) = oneshot::channel();
        self.install(&directive, PendingResponder::Distance(tx), preview);
        rx.await.unwrap_or(InputRequestResult::Cancel)
    }

    /// 请求一段文本
    pub async fn get_text(&self, directive: UserDirective) -> InputRequestResult<String> {
        let (tx, rx) = oneshot::channel();
        self.install(&directive, PendingResponder::Text(tx), None);
        rx.await.unwrap_or(InputRequestResult::Cancel)
    }

    /// 等待一次确认（回车/右键）
    pub async fn get_none(&self, directive: UserDirective) -> InputRequestResult<()> {
        let (tx, rx) = oneshot::channel();
        self.install(&directive, PendingResponder::None(tx), None);
        rx.await.unwrap_or(InputRequestResult::Cancel)
    }

    fn install(
        &self,
        directive: &UserDirective,
        responder: PendingResponder,
        preview: Option<Arc<RubberBandGenerator>>,
    ) {
        let kind = responder.kind();
        let mut allowed = InputKindSet::single(kind);
        if !directive.tokens.is_empty() {
            allowed.insert(InputKind::Directive);
        }

        let replaced = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let replaced = st.pending.take();
            st.allowed = allowed;
            st.directive_tokens = directive.tokens.clone();
            st.rubber_band = preview;
            st.gathered_entities.clear();
            st.pending = Some(responder);
            replaced
        };
        // 同类请求不允许并发：旧请求按取消处理
        if let Some(prev) = replaced {
            warn!(kind = prev.kind().name(), "新的输入请求替换了未完成的请求");
            prev.cancel();
        }

        if !directive.prompt.is_empty() {
            self.hub.publish(WorkspaceEvent::OutputMessage {
                text: directive.prompt.clone(),
            });
        }
        self.hub.publish(WorkspaceEvent::ValueRequested { allowed });
        debug!(kind = kind.name(), "输入请求已挂起");
    }

    // ---------- 推入端（UI 线程调用） ----------

    /// 推入一个点
    pub fn push_point(&self, point: Point3) {
        let responder = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !st.allowed.contains(InputKind::Point) {
                drop(st);
                self.reject("当前不接受点输入");
                return;
            }
            st.last_point = Some(point);
            st.finish()
        };
        self.resolve(responder, |r| match r {
            PendingResponder::Point(tx) => {
                let _ = tx.send(InputRequestResult::Value(point));
                true
            }
            other => {
                other.cancel();
                false
            }
        });
    }

    /// 推入一个实体
    pub fn push_entity(&self, selected: SelectedEntity) {
        let responder = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !st.allowed.contains(InputKind::Entity) {
                drop(st);
                self.reject("当前不接受实体输入");
                return;
            }
            st.finish()
        };
        self.resolve(responder, |r| match r {
            PendingResponder::Entity(tx) => {
                let _ = tx.send(InputRequestResult::Value(selected));
                true
            }
            other => {
                other.cancel();
                false
            }
        });
    }

    /// 向实体集请求追加选择；请求保持挂起直到空输入提交
    pub fn push_entities(&self, entities: Vec<Entity>) {
        let total = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !st.allowed.contains(InputKind::Entities) {
                drop(st);
                self.reject("当前不接受实体集输入");
                return;
            }
            st.gathered_entities.extend(entities);
            st.gathered_entities.len()
        };
        self.hub.publish(WorkspaceEvent::OutputMessage {
            text: format!("已选择 {} 个对象", total),
        });
    }

    /// 推入一个距离
    pub fn push_distance(&self, distance: f64) {
        let responder = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !st.allowed.contains(InputKind::Distance) {
                drop(st);
                self.reject("当前不接受距离输入");
                return;
            }
            st.finish()
        };
        self.resolve(responder, |r| match r {
            PendingResponder::Distance(tx) => {
                let _ = tx.send(InputRequestResult::Value(distance));
                true
            }
            other => {
                other.cancel();
                false
            }
        });
    }

    /// 推入一段文本
    pub fn push_text(&self, text: String) {
        let responder = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !st.allowed.contains(InputKind::Text) {
                drop(st);
                self.reject("当前不接受文本输入");
                return;
            }
            st.finish()
        };
        self.resolve(responder, |r| match r {
            PendingResponder::Text(tx) => {
                let _ = tx.send(InputRequestResult::Value(text));
                true
            }
            other => {
                other.cancel();
                false
            }
        });
    }

    /// 推入选项关键字
    ///
    /// 不在当前提示选项表中的关键字被拒绝，请求保持挂起。
    pub fn push_directive(&self, token: &str) {
        let responder = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !st.allowed.contains(InputKind::Directive) {
                drop(st);
                self.reject("当前不接受选项输入");
                return;
            }
            if !st
                .directive_tokens
                .iter()
                .any(|t| t.eq_ignore_ascii_case(token))
            {
                drop(st);
                self.reject(&format!("无效选项: {}", token));
                return;
            }
            st.finish()
        };
        let token = token.to_lowercase();
        if let Some(r) = responder {
            r.directive(token);
            self.hub.publish(WorkspaceEvent::ValueReceived);
        }
    }

    /// 推入空输入（回车/右键）
    ///
    /// 实体集请求以累积的选择作为值完成；其余挂起请求收到空结果；
    /// 空闲时触发重复上一命令。
    pub fn push_none(&self) {
        let (gathered, responder) = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let gathered = std::mem::take(&mut st.gathered_entities);
            (gathered, st.finish())
        };
        match responder {
            Some(PendingResponder::Entities(tx)) => {
                let _ = tx.send(InputRequestResult::Value(gathered));
                self.hub.publish(WorkspaceEvent::ValueReceived);
            }
            Some(r) => {
                r.none();
                self.hub.publish(WorkspaceEvent::ValueReceived);
            }
            // 空闲回车/右键：重复上一命令
            None => self.dispatch_command(None),
        }
    }

    /// 推入命令名；空名称重复上一命令
    pub fn push_command(&self, name: &str) {
        {
            let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !st.allowed.contains(InputKind::Command) {
                drop(st);
                self.reject("当前正在等待其他输入");
                return;
            }
        }
        let name = name.trim();
        if name.is_empty() {
            self.dispatch_command(None);
        } else {
            self.dispatch_command(Some(name.to_string()));
        }
    }

    /// 取消当前请求
    pub fn cancel(&self) {
        let responder = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            st.finish()
        };
        if let Some(r) = responder {
            debug!(kind = r.kind().name(), "输入请求被取消");
            r.cancel();
            self.hub.publish(WorkspaceEvent::ValueReceived);
        }
    }

    // ---------- 状态查询 ----------

    /// 当前允许的输入类别
    pub fn allowed(&self) -> InputKindSet {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.allowed
    }

    /// 是否有未决请求
    pub fn is_awaiting(&self) -> bool {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.pending.is_some()
    }

    /// 未决请求的类别
    pub fn awaiting_kind(&self) -> Option<InputKind> {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.pending.as_ref().map(|p| p.kind())
    }

    /// 当前命令的橡皮筋生成器
    pub fn rubber_band(&self) -> Option<Arc<RubberBandGenerator>> {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.rubber_band.clone()
    }

    /// 最近一次成功推入的点（正交/角度捕捉的基准）
    pub fn last_point(&self) -> Option<Point3> {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.last_point
    }

    /// 清除最近落点（命令结束时调用）
    pub fn clear_last_point(&self) {
        let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.last_point = None;
    }

    /// 文本是否匹配当前提示的选项关键字
    pub fn matches_directive(&self, text: &str) -> bool {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.allowed.contains(InputKind::Directive)
            && st
                .directive_tokens
                .iter()
                .any(|t| t.eq_ignore_ascii_case(text))
    }

    // ---------- 内部 ----------

    fn resolve<F>(&self, responder: Option<PendingResponder>, send: F)
    where
        F: FnOnce(PendingResponder) -> bool,
    {
        if let Some(r) = responder {
            if !send(r) {
                warn!("输入状态与请求类别不一致，按取消处理");
            }
            self.hub.publish(WorkspaceEvent::ValueReceived);
        }
    }

    fn dispatch_command(&self, name: Option<String>) {
        let sink = self.command_sink.lock().unwrap_or_else(|e| e.into_inner());
        match sink.as_ref() {
            Some(sink) => sink(name),
            None => warn!("命令派发器未安装，忽略命令输入"),
        }
    }

    fn reject(&self, reason: &str) {
        warn!(reason, "输入被拒绝");
        self.hub.publish(WorkspaceEvent::InputRejected {
            reason: reason.to_string(),
        });
    }
}

// ========== 测试 ==========

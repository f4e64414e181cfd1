//! 显示交互管理
//!
//! 持有视口变换，把原始指针/键盘事件转换成输入协调器
//! 期待的值。每次指针移动按优先级解析活动点：
//! 对象捕捉 → 正交约束 → 角度捕捉 → 原始反投影。
//! 同一事件内的所有几何解析使用同一份变换快照。

use crate::command::CommandGate;
use crate::events::{EventHub, WorkspaceEvent};
use crate::hit_test;
use crate::input::{InputBroker, InputKind, InputKindSet};
use crate::selection::{
    entities_in_rectangle, SelectionMode, SelectionRectangle, SelectionState,
};
use crate::snap_index::{rank_candidates, SnapPointIndex, TransformedSnapPoint};
use crate::viewport::{TransformError, ViewPort, ViewportSnapshot};
use dcad_core::drawing::Drawing;
use dcad_core::entity::{Entity, EntityId};
use dcad_core::input_parser::InputParser;
use dcad_core::math::{DrawingPlane, Point2, Point3, ScreenRect, EPSILON};
use dcad_core::settings::WorkspaceSettings;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// 初始表面尺寸，第一次 resize 之前生效
const DEFAULT_SURFACE_WIDTH: f64 = 800.0;
const DEFAULT_SURFACE_HEIGHT: f64 = 600.0;

// ========== 光标形态 ==========

/// 鼠标按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// 光标形态掩码（位域）
///
/// 由当前允许的输入类别与平移开关推导，宿主 UI 据此
/// 切换十字光标、拾取框、插入符与手形。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorStateSet {
    bits: u16,
}

impl CursorStateSet {
    /// 点输入十字光标
    pub const POINT: u16 = 1 << 0;
    /// 对象拾取框
    pub const OBJECT: u16 = 1 << 1;
    /// 文本插入符
    pub const TEXT: u16 = 1 << 2;
    /// 平移手形
    pub const PAN: u16 = 1 << 3;

    pub const EMPTY: CursorStateSet = CursorStateSet { bits: 0 };

    pub fn new(bits: u16) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn contains(&self, bits: u16) -> bool {
        self.bits & bits != 0
    }

    pub fn insert(&mut self, bits: u16) {
        self.bits |= bits;
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// 由允许的输入类别与平移开关推导光标形态
    pub fn from_allowed(allowed: InputKindSet, pan_mode: bool) -> Self {
        let mut state = CursorStateSet::EMPTY;
        if allowed.contains(InputKind::Point) || allowed.contains(InputKind::Distance) {
            state.insert(Self::POINT);
        }
        if allowed.contains(InputKind::Entity) || allowed.contains(InputKind::Entities) {
            state.insert(Self::OBJECT);
        }
        if allowed.contains(InputKind::Text) || allowed.contains(InputKind::Command) {
            state.insert(Self::TEXT);
        }
        if pan_mode {
            state.insert(Self::PAN);
        }
        state
    }
}

// ========== 交互状态 ==========

struct InteractionState {
    viewport: ViewPort,
    width: f64,
    height: f64,
    snapshot: ViewportSnapshot,
    /// 平移拖拽中的上一个屏幕位置
    pan_from: Option<Point2>,
    pan_mode: bool,
    /// 进行中选择框的第一角（屏幕与世界坐标）
    rect_origin: Option<(Point2, Point3)>,
    /// 等待完成矩形的请求方
    rect_waiter: Option<oneshot::Sender<SelectionRectangle>>,
    /// 上一次绘制的捕捉指示
    last_snap: Option<TransformedSnapPoint>,
    cursor_world: Point3,
    /// 持久选择集（无命令执行时的点选/框选结果）
    selection: BTreeMap<EntityId, Entity>,
    /// 活动绘图平面（正交与角度捕捉的参考系）
    plane: DrawingPlane,
    last_cursor_state: CursorStateSet,
}

/// 尝试提交新视口；变换退化时保留原状态
fn commit_viewport(st: &mut InteractionState, viewport: ViewPort) -> Option<ViewportSnapshot> {
    match ViewportSnapshot::new(&viewport, st.width, st.height) {
        Ok(snapshot) => {
            st.viewport = viewport;
            st.snapshot = snapshot.clone();
            Some(snapshot)
        }
        Err(e) => {
            warn!(error = %e, "视口更新产生退化变换，保持原状");
            None
        }
    }
}

fn hot_points_of(selection: &BTreeMap<EntityId, Entity>) -> Vec<Point3> {
    selection.values().flat_map(|e| e.hot_points()).collect()
}

/// 正交约束：把光标点拉到相对基准点的主导平面轴上
fn ortho_constrained(last: &Point3, raw: &Point3, plane: &DrawingPlane) -> Point3 {
    let (u, v) = plane.components(&(raw - last));
    if u.abs() >= v.abs() {
        last + plane.from_components(u, 0.0)
    } else {
        last + plane.from_components(0.0, v)
    }
}

/// 角度捕捉：在配置角度的射线上取与光标屏幕距离最近且
/// 在阈值内的点；射线长度取光标到基准点的世界距离
fn nearest_angle_snap(
    last: &Point3,
    raw: &Point3,
    cursor: &Point2,
    snapshot: &ViewportSnapshot,
    plane: &DrawingPlane,
    settings: &WorkspaceSettings,
) -> Option<Point3> {
    let distance = (raw - last).norm();
    if distance < EPSILON {
        return None;
    }
    let mut best: Option<(f64, Point3)> = None;
    for angle in &settings.snap_angles {
        let candidate = last + plane.direction_at(*angle) * distance;
        let screen_dist = (snapshot.project(&candidate) - cursor).norm();
        if screen_dist > settings.snap_angle_distance {
            continue;
        }
        match &best {
            Some((d, _)) if screen_dist >= *d => {}
            _ => best = Some((screen_dist, candidate)),
        }
    }
    best.map(|(_, p)| p)
}

// ========== 交互引擎 ==========

/// 显示交互引擎
pub struct InteractionEngine {
    state: Mutex<InteractionState>,
    broker: Arc<InputBroker>,
    index: Arc<SnapPointIndex>,
    hub: Arc<EventHub>,
    gate: Arc<CommandGate>,
    drawing: Arc<RwLock<Arc<Drawing>>>,
    settings: Arc<RwLock<WorkspaceSettings>>,
    /// 捕捉指示绘制请求的单调递增序号，迟到的结果直接丢弃
    draw_id: AtomicU64,
}

impl InteractionEngine {
    pub fn new(
        broker: Arc<InputBroker>,
        index: Arc<SnapPointIndex>,
        hub: Arc<EventHub>,
        gate: Arc<CommandGate>,
        drawing: Arc<RwLock<Arc<Drawing>>>,
        settings: Arc<RwLock<WorkspaceSettings>>,
    ) -> Result<Self, TransformError> {
        let viewport = ViewPort::default();
        let snapshot =
            ViewportSnapshot::new(&viewport, DEFAULT_SURFACE_WIDTH, DEFAULT_SURFACE_HEIGHT)?;
        Ok(Self {
            state: Mutex::new(InteractionState {
                viewport,
                width: DEFAULT_SURFACE_WIDTH,
                height: DEFAULT_SURFACE_HEIGHT,
                snapshot,
                pan_from: None,
                pan_mode: false,
                rect_origin: None,
                rect_waiter: None,
                last_snap: None,
                cursor_world: Point3::origin(),
                selection: BTreeMap::new(),
                plane: DrawingPlane::xy(),
                last_cursor_state: CursorStateSet::EMPTY,
            }),
            broker,
            index,
            hub,
            gate,
            drawing,
            settings,
            draw_id: AtomicU64::new(0),
        })
    }

    // ---------- 视口 ----------

    /// 表面尺寸变化：重建投影变换并触发索引重建
    pub fn resize(&self, width: f64, height: f64) -> Result<(), TransformError> {
        let committed = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match ViewportSnapshot::new(&st.viewport, width, height) {
                Ok(snapshot) => {
                    st.width = width;
                    st.height = height;
                    st.snapshot = snapshot.clone();
                    Ok(snapshot)
                }
                Err(e) => {
                    warn!(width, height, error = %e, "表面尺寸退化，保留原变换");
                    Err(e)
                }
            }
        };
        let snapshot = committed?;
        self.after_viewport_change(Some(snapshot));
        Ok(())
    }

    /// 按屏幕像素位移平移视口
    pub fn pan(&self, dx: f64, dy: f64) {
        let committed = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let moved = st.viewport.panned(dx, dy, st.height);
            commit_viewport(&mut st, moved)
        };
        self.after_viewport_change(committed);
    }

    /// 以光标为锚点缩放
    pub fn mouse_wheel(&self, x: f64, y: f64, delta: f64) {
        let zoom_scale = {
            let settings = self.settings.read().unwrap_or_else(|e| e.into_inner());
            settings.zoom_scale
        };
        let committed = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let zoomed =
                st.viewport
                    .zoomed_about(&st.snapshot, Point2::new(x, y), delta, zoom_scale);
            commit_viewport(&mut st, zoomed)
        };
        self.after_viewport_change(committed);
    }

    /// 缩放视口使其恰好容纳世界矩形
    pub fn zoom_to_world_rect(&self, corner1: Point3, corner2: Point3) -> bool {
        let committed = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let aspect = st.width / st.height;
            match ViewPort::fitted_to(corner1, corner2, aspect) {
                Some(viewport) => commit_viewport(&mut st, viewport),
                None => {
                    warn!("缩放窗口退化，忽略");
                    None
                }
            }
        };
        let committed_some = committed.is_some();
        self.after_viewport_change(committed);
        committed_some
    }

    fn after_viewport_change(&self, committed: Option<ViewportSnapshot>) {
        if let Some(snapshot) = committed {
            self.hub.publish(WorkspaceEvent::ViewPortChanged);
            self.index.begin_rebuild(self.current_drawing(), snapshot);
        }
    }

    // ---------- 指针事件 ----------

    pub fn mouse_move(&self, x: f64, y: f64) {
        let screen = Point2::new(x, y);
        let draw_id = self.draw_id.fetch_add(1, Ordering::SeqCst) + 1;

        let (snapshot, rect_active) = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            // 平移拖拽只移动视口，不做点解析
            if let Some(from) = st.pan_from {
                let moved = st
                    .viewport
                    .panned(screen.x - from.x, screen.y - from.y, st.height);
                st.pan_from = Some(screen);
                let committed = commit_viewport(&mut st, moved);
                drop(st);
                self.after_viewport_change(committed);
                return;
            }
            let rect_active = st.rect_origin.is_some() || st.rect_waiter.is_some();
            (st.snapshot.clone(), rect_active)
        };

        let (resolved, snap) = self.resolve_active_point(&screen, &snapshot, draw_id, rect_active);

        // 更晚的指针事件已经开始，本次结果作废
        if self.draw_id.load(Ordering::SeqCst) != draw_id {
            return;
        }

        let allowed = self.broker.allowed();
        let point_like =
            allowed.contains(InputKind::Point) || allowed.contains(InputKind::Distance);

        let (snap_changed, rect_state) = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            st.cursor_world = resolved;
            let snap_changed = if (point_like || rect_active) && st.last_snap != snap {
                st.last_snap = snap;
                true
            } else {
                false
            };
            let rect_state = st.rect_origin.map(|(origin, _)| SelectionState {
                rectangle: ScreenRect::from_corners(origin, screen),
                mode: SelectionMode::from_drag(origin.x, screen.x),
            });
            (snap_changed, rect_state)
        };

        self.hub
            .publish(WorkspaceEvent::CursorWorldLocationUpdated { point: resolved });
        if snap_changed {
            self.hub
                .publish(WorkspaceEvent::CurrentSnapPointUpdated { snap });
        }
        if let Some(state) = rect_state {
            self.hub.publish(WorkspaceEvent::SelectionRectangleUpdated {
                state: Some(state),
            });
        }
        if let Some(generator) = self.broker.rubber_band() {
            self.hub.publish(WorkspaceEvent::RubberBandPrimitivesChanged {
                primitives: generator(&resolved),
            });
        }
    }

    pub fn mouse_down(&self, x: f64, y: f64, button: MouseButton) {
        let screen = Point2::new(x, y);
        match button {
            MouseButton::Middle => {
                let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
                st.pan_from = Some(screen);
            }
            MouseButton::Right => self.broker.push_none(),
            MouseButton::Left => self.left_mouse_down(screen),
        }
    }

    pub fn mouse_up(&self, _x: f64, _y: f64, button: MouseButton) {
        if matches!(button, MouseButton::Left | MouseButton::Middle) {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            st.pan_from = None;
        }
    }

    fn left_mouse_down(&self, screen: Point2) {
        {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if st.pan_mode {
                st.pan_from = Some(screen);
                return;
            }
        }
        let draw_id = self.draw_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (snapshot, rect_active, waiter_installed) = {
            let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            (
                st.snapshot.clone(),
                st.rect_origin.is_some(),
                st.rect_waiter.is_some(),
            )
        };
        let allowed = self.broker.allowed();

        if allowed.contains(InputKind::Point) {
            let (resolved, _) = self.resolve_active_point(&screen, &snapshot, draw_id, false);
            self.broker.push_point(resolved);
            return;
        }
        if allowed.contains(InputKind::Distance) {
            // 点击测距：以最近落点为基准
            if let Some(last) = self.broker.last_point() {
                let (resolved, _) = self.resolve_active_point(&screen, &snapshot, draw_id, false);
                self.broker.push_distance((resolved - last).norm());
            }
            return;
        }
        if allowed.contains(InputKind::Entity) {
            let radius = {
                let settings = self.settings.read().unwrap_or_else(|e| e.into_inner());
                settings.entity_selection_radius
            };
            if let Some(selected) =
                hit_test::hit_test_drawing(&self.current_drawing(), &snapshot, &screen, radius)
            {
                self.broker.push_entity(selected);
            }
            return;
        }
        // 实体集请求、进行中的矩形或空闲时：点选或框选
        if allowed.contains(InputKind::Entities)
            || rect_active
            || waiter_installed
            || !self.gate.is_executing()
        {
            self.click_or_rectangle(screen, &snapshot, draw_id, waiter_installed);
        }
    }

    // ---------- 选择 ----------

    fn click_or_rectangle(
        &self,
        screen: Point2,
        snapshot: &ViewportSnapshot,
        draw_id: u64,
        waiter_installed: bool,
    ) {
        let origin = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            st.rect_origin.take()
        };
        // 本次点击是完成角
        if let Some((origin_screen, origin_world)) = origin {
            self.complete_rectangle(origin_screen, origin_world, screen, snapshot, draw_id);
            return;
        }

        // 矩形等待者在场时跳过点选，直接记录第一角
        if !waiter_installed {
            let radius = {
                let settings = self.settings.read().unwrap_or_else(|e| e.into_inner());
                settings.entity_selection_radius
            };
            if let Some(selected) =
                hit_test::hit_test_drawing(&self.current_drawing(), snapshot, &screen, radius)
            {
                if self.broker.allowed().contains(InputKind::Entities) {
                    self.broker.push_entities(vec![selected.entity]);
                } else {
                    self.add_to_selection(vec![selected.entity]);
                }
                return;
            }
        }

        // 未命中：开始矩形跟踪，记录第一角的屏幕与世界坐标
        let (origin_world, _) = self.resolve_active_point(&screen, snapshot, draw_id, true);
        {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            st.rect_origin = Some((screen, origin_world));
        }
        self.hub.publish(WorkspaceEvent::SelectionRectangleUpdated {
            state: Some(SelectionState {
                rectangle: ScreenRect::from_corners(screen, screen),
                mode: SelectionMode::WholeEntity,
            }),
        });
    }

    fn complete_rectangle(
        &self,
        origin_screen: Point2,
        origin_world: Point3,
        screen: Point2,
        snapshot: &ViewportSnapshot,
        draw_id: u64,
    ) {
        let state = SelectionState {
            rectangle: ScreenRect::from_corners(origin_screen, screen),
            mode: SelectionMode::from_drag(origin_screen.x, screen.x),
        };
        let waiter = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            st.rect_waiter.take()
        };
        if let Some(waiter) = waiter {
            let (corner2, _) = self.resolve_active_point(&screen, snapshot, draw_id, true);
            let _ = waiter.send(SelectionRectangle {
                screen: state.rectangle,
                world_corner1: origin_world,
                world_corner2: corner2,
            });
        } else {
            let selected = entities_in_rectangle(&self.current_drawing(), snapshot, &state);
            debug!(count = selected.len(), mode = ?state.mode, "矩形选择完成");
            if self.broker.allowed().contains(InputKind::Entities) {
                self.broker.push_entities(selected);
            } else {
                self.add_to_selection(selected);
            }
        }
        self.hub
            .publish(WorkspaceEvent::SelectionRectangleUpdated { state: None });
    }

    /// 请求一次矩形选择，两次左键点击确定两角
    ///
    /// 等待期间被取消时返回 None。命令互斥下并发的第二次
    /// 矩形请求不可能出现，视为编程错误。
    pub async fn get_selection_rectangle(&self) -> Option<SelectionRectangle> {
        let rx = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if st.rect_waiter.is_some() {
                panic!("矩形选择请求不允许并发");
            }
            let (tx, rx) = oneshot::channel();
            st.rect_waiter = Some(tx);
            rx
        };
        rx.await.ok()
    }

    /// 是否有未完成的矩形选择请求
    pub fn rectangle_pending(&self) -> bool {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.rect_waiter.is_some()
    }

    /// 并入持久选择集并重算热点
    fn add_to_selection(&self, entities: Vec<Entity>) {
        if entities.is_empty() {
            return;
        }
        let points = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            for entity in entities {
                st.selection.insert(entity.id, entity);
            }
            hot_points_of(&st.selection)
        };
        self.publish_hot_points(points);
    }

    /// 当前持久选择集
    pub fn selected_entities(&self) -> Vec<Entity> {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.selection.values().cloned().collect()
    }

    /// 清空持久选择集
    pub fn clear_selection(&self) {
        let cleared = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let had = !st.selection.is_empty();
            st.selection.clear();
            had
        };
        if cleared {
            self.publish_hot_points(Vec::new());
        }
    }

    /// 文档变更后清理失效的选择并重算热点
    pub fn prune_selection(&self) {
        let drawing = self.current_drawing();
        let changed = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let before = st.selection.len();
            st.selection.retain(|id, _| drawing.contains_entity(*id));
            if st.selection.len() != before {
                Some(hot_points_of(&st.selection))
            } else {
                None
            }
        };
        if let Some(points) = changed {
            self.publish_hot_points(points);
        }
    }

    fn publish_hot_points(&self, points: Vec<Point3>) {
        // 命令执行期间热点无意义，不发布
        if self.gate.is_executing() {
            return;
        }
        self.hub
            .publish(WorkspaceEvent::HotPointsUpdated { points });
    }

    // ---------- 活动点解析 ----------

    /// 按优先级解析活动点，返回世界坐标与命中的捕捉候选
    fn resolve_active_point(
        &self,
        screen: &Point2,
        snapshot: &ViewportSnapshot,
        draw_id: u64,
        rect_active: bool,
    ) -> (Point3, Option<TransformedSnapPoint>) {
        let settings = {
            let guard = self.settings.read().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        let allowed = self.broker.allowed();
        let point_like =
            allowed.contains(InputKind::Point) || allowed.contains(InputKind::Distance);

        // 1. 对象捕捉
        if settings.point_snap && (point_like || rect_active) {
            if let Some(snap) = self.snap_at(screen, settings.snap_point_distance, draw_id) {
                return (snap.world_point, Some(snap));
            }
        }

        let raw = snapshot.unproject(screen);

        // 2/3. 正交与角度捕捉需要基准点
        if point_like {
            if let Some(last) = self.broker.last_point() {
                let plane = {
                    let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
                    st.plane
                };
                if settings.ortho {
                    return (ortho_constrained(&last, &raw, &plane), None);
                }
                if settings.angle_snap {
                    if let Some(p) =
                        nearest_angle_snap(&last, &raw, screen, snapshot, &plane, &settings)
                    {
                        return (p, None);
                    }
                }
            }
        }

        // 4. 原始反投影
        (raw, None)
    }

    /// 查询光标附近的捕捉候选并取屏幕距离最近者
    fn snap_at(&self, cursor: &Point2, radius: f64, draw_id: u64) -> Option<TransformedSnapPoint> {
        let window = ScreenRect::around(*cursor, radius);
        let candidates = self.index.query_window(&window);
        let winner = rank_candidates(&candidates, cursor, || {
            self.draw_id.load(Ordering::SeqCst) != draw_id
        })?;
        // 窗口查询是方形的，按圆形半径过滤
        if (winner.screen_point - cursor).norm_squared() <= radius * radius {
            Some(winner)
        } else {
            None
        }
    }

    // ---------- 文本输入 ----------

    /// 文本输入的统一入口，按当前允许的输入类别依次尝试：
    /// 选项关键字 → 距离 → 点 → 命令名 → 自由文本
    pub fn submit_input(&self, text: &str) {
        let text = text.trim();
        // 空输入等价于回车确认
        if text.is_empty() {
            self.broker.push_none();
            return;
        }
        let allowed = self.broker.allowed();

        if allowed.contains(InputKind::Directive) && self.broker.matches_directive(text) {
            self.broker.push_directive(text);
            return;
        }
        if allowed.contains(InputKind::Distance) {
            match self
                .current_drawing()
                .parse_distance(text, self.broker.last_point())
            {
                Ok(d) => {
                    self.broker.push_distance(d);
                    return;
                }
                Err(e) => debug!(text, error = %e, "距离解析失败"),
            }
        }
        if allowed.contains(InputKind::Point) {
            match InputParser::parse_point(text, self.broker.last_point()) {
                Ok(p) => {
                    self.broker.push_point(p);
                    return;
                }
                Err(e) => debug!(text, error = %e, "点解析失败"),
            }
        }
        if allowed.contains(InputKind::Command) {
            self.broker.push_command(text);
            return;
        }
        if allowed.contains(InputKind::Text) {
            self.broker.push_text(text.to_string());
            return;
        }
        warn!(text, allowed = %allowed, "文本无法按当前允许的输入类别解析");
        self.hub.publish(WorkspaceEvent::InputRejected {
            reason: format!("无法解析输入: {}", text),
        });
    }

    // ---------- 瞬态状态 ----------

    /// 取消当前交互：清除矩形与捕捉指示并取消未决请求；
    /// 空闲时清空持久选择集
    pub fn cancel_interaction(&self) {
        let (rect_was, snap_was, selection_cleared) = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let rect_origin_was = st.rect_origin.take().is_some();
            let waiter_was = st.rect_waiter.take().is_some();
            let snap_was = st.last_snap.take().is_some();
            let selection_cleared = if !self.broker.is_awaiting() && !st.selection.is_empty() {
                st.selection.clear();
                true
            } else {
                false
            };
            (rect_origin_was || waiter_was, snap_was, selection_cleared)
        };
        if rect_was {
            self.hub
                .publish(WorkspaceEvent::SelectionRectangleUpdated { state: None });
        }
        if snap_was {
            self.hub
                .publish(WorkspaceEvent::CurrentSnapPointUpdated { snap: None });
        }
        if selection_cleared {
            self.publish_hot_points(Vec::new());
        }
        self.broker.cancel();
    }

    /// 输入请求开始/结束时重置瞬态交互状态
    pub fn reset_transient_interaction(&self) {
        let (rect_was, snap_was) = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            (st.rect_origin.take().is_some(), st.last_snap.take().is_some())
        };
        if rect_was {
            self.hub
                .publish(WorkspaceEvent::SelectionRectangleUpdated { state: None });
        }
        if snap_was {
            self.hub
                .publish(WorkspaceEvent::CurrentSnapPointUpdated { snap: None });
        }
        self.hub.publish(WorkspaceEvent::RubberBandPrimitivesChanged {
            primitives: Vec::new(),
        });
        self.publish_cursor_state();
    }

    /// 重新计算光标形态并在变化时广播
    pub fn publish_cursor_state(&self) {
        let changed = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let state = CursorStateSet::from_allowed(self.broker.allowed(), st.pan_mode);
            if st.last_cursor_state == state {
                None
            } else {
                st.last_cursor_state = state;
                Some(state)
            }
        };
        if let Some(state) = changed {
            self.hub
                .publish(WorkspaceEvent::CursorStateUpdated { state });
        }
    }

    /// 切换平移模式（左键拖拽平移）
    pub fn set_pan_mode(&self, on: bool) {
        {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            st.pan_mode = on;
            if !on {
                st.pan_from = None;
            }
        }
        self.publish_cursor_state();
    }

    // ---------- 查询 ----------

    /// 当前视口
    pub fn viewport(&self) -> ViewPort {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.viewport
    }

    /// 当前变换快照
    pub fn snapshot(&self) -> ViewportSnapshot {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.snapshot.clone()
    }

    /// 最近一次解析的光标世界坐标
    pub fn cursor_world(&self) -> Point3 {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.cursor_world
    }

    /// 活动绘图平面
    pub fn drawing_plane(&self) -> DrawingPlane {
        let st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.plane
    }

    pub fn set_drawing_plane(&self, plane: DrawingPlane) {
        let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.plane = plane;
    }

    fn current_drawing(&self) -> Arc<Drawing> {
        let guard = self.drawing.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }
}

// ========== 测试 ==========

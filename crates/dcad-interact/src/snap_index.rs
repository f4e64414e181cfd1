//! 捕捉点空间索引
//!
//! 把可见实体的捕捉点投影到屏幕空间后装入四叉树，
//! 指针移动时按光标附近的窗口查询候选。
//!
//! 索引按代号发布：每次视口或文档变化都使代号自增并在后台
//! 重建；重建过程定期对照代号，发现已有更新的请求时丢弃
//! 部分结果直接退出。查询方始终读取最近一次完整发布的快照，
//! 不会看到半成品。

use crate::viewport::ViewportSnapshot;
use dcad_core::drawing::Drawing;
use dcad_core::geometry::SnapPointKind;
use dcad_core::math::{Point2, Point3, ScreenRect};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task;
use tracing::{debug, warn};

/// 单个四叉树节点分裂前容纳的捕捉点数
const NODE_CAPACITY: usize = 16;
/// 四叉树最大深度
const MAX_DEPTH: usize = 8;
/// 建树/排序过程中检查取消的间隔（元素个数）
const CANCEL_CHECK_INTERVAL: usize = 256;

/// 投影后的捕捉点：同时保留世界坐标与屏幕坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformedSnapPoint {
    pub world_point: Point3,
    pub screen_point: Point2,
    pub kind: SnapPointKind,
}

// ========== 四叉树 ==========

struct Node {
    bounds: ScreenRect,
    points: Vec<TransformedSnapPoint>,
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(bounds: ScreenRect) -> Self {
        Self {
            bounds,
            points: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, point: TransformedSnapPoint, depth: usize) {
        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.bounds.contains(&point.screen_point) {
                    child.insert(point, depth + 1);
                    return;
                }
            }
            // 不落入任何子象限的点留在本节点
            self.points.push(point);
            return;
        }

        self.points.push(point);
        if self.points.len() > NODE_CAPACITY && depth < MAX_DEPTH {
            self.split(depth);
        }
    }

    fn split(&mut self, depth: usize) {
        let center = self.bounds.center();
        let min = self.bounds.min;
        let max = self.bounds.max;
        let children = Box::new([
            Node::new(ScreenRect::from_corners(min, center)),
            Node::new(ScreenRect::from_corners(
                Point2::new(center.x, min.y),
                Point2::new(max.x, center.y),
            )),
            Node::new(ScreenRect::from_corners(
                Point2::new(min.x, center.y),
                Point2::new(center.x, max.y),
            )),
            Node::new(ScreenRect::from_corners(center, max)),
        ]);
        self.children = Some(children);

        let points = std::mem::take(&mut self.points);
        for p in points {
            self.insert(p, depth);
        }
    }

    fn query(&self, rect: &ScreenRect, out: &mut Vec<TransformedSnapPoint>) {
        for p in &self.points {
            if rect.contains(&p.screen_point) {
                out.push(*p);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.bounds.intersects(rect) {
                    child.query(rect, out);
                }
            }
        }
    }

    fn len(&self) -> usize {
        let mut count = self.points.len();
        if let Some(children) = &self.children {
            for child in children.iter() {
                count += child.len();
            }
        }
        count
    }
}

/// 屏幕空间捕捉点四叉树
pub struct QuadTree {
    root: Node,
}

impl QuadTree {
    /// 以屏幕范围为根包围盒创建空树
    pub fn new(bounds: ScreenRect) -> Self {
        Self {
            root: Node::new(bounds),
        }
    }

    /// 插入捕捉点
    ///
    /// 投影到屏幕范围之外的点保留在根节点，窗口查询仍能
    /// 正确过滤到它们。
    pub fn insert(&mut self, point: TransformedSnapPoint) {
        if self.root.bounds.contains(&point.screen_point) {
            self.root.insert(point, 0);
        } else {
            self.root.points.push(point);
        }
    }

    /// 窗口查询：返回屏幕矩形内的全部捕捉点
    pub fn query(&self, rect: &ScreenRect) -> Vec<TransformedSnapPoint> {
        let mut out = Vec::new();
        self.root.query(rect, &mut out);
        out
    }

    /// 捕捉点总数
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ========== 按代号发布的索引 ==========

/// 一次完整重建的产物
struct IndexSnapshot {
    generation: u64,
    tree: QuadTree,
}

/// 捕捉点索引
///
/// 读路径（窗口查询）无锁争用：只克隆当前快照的 Arc。
/// 写路径（重建）在后台任务中进行，完成后整体替换快照。
pub struct SnapPointIndex {
    generation: AtomicU64,
    published: RwLock<Arc<IndexSnapshot>>,
}

impl SnapPointIndex {
    pub fn new() -> Self {
        let empty = IndexSnapshot {
            generation: 0,
            tree: QuadTree::new(ScreenRect::from_corners(
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 1.0),
            )),
        };
        Self {
            generation: AtomicU64::new(0),
            published: RwLock::new(Arc::new(empty)),
        }
    }

    /// 最近一次发布的代号
    pub fn published_generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// 当前快照中的捕捉点数量
    pub fn point_count(&self) -> usize {
        self.snapshot().tree.len()
    }

    /// 窗口查询当前快照
    pub fn query_window(&self, rect: &ScreenRect) -> Vec<TransformedSnapPoint> {
        self.snapshot().tree.query(rect)
    }

    /// 请求一次后台重建，返回新代号
    ///
    /// 旧的重建请求立即失效：它们在下一个检查点发现代号
    /// 已变化后丢弃部分结果退出。
    pub fn begin_rebuild(
        self: &Arc<Self>,
        drawing: Arc<Drawing>,
        snapshot: ViewportSnapshot,
    ) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let index = Arc::clone(self);
        tokio::spawn(async move {
            let builder = Arc::clone(&index);
            let built =
                task::spawn_blocking(move || builder.build(&drawing, &snapshot, generation)).await;
            match built {
                Ok(Some(tree)) => index.publish(generation, tree),
                Ok(None) => debug!(generation, "捕捉点索引重建被更新的请求取代"),
                Err(e) => warn!(generation, error = %e, "捕捉点索引重建任务失败"),
            }
        });
        generation
    }

    fn snapshot(&self) -> Arc<IndexSnapshot> {
        let published = self.published.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&published)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn build(
        &self,
        drawing: &Drawing,
        snapshot: &ViewportSnapshot,
        generation: u64,
    ) -> Option<QuadTree> {
        // 收集世界坐标捕捉点，按实体粒度检查取消
        let mut world_points = Vec::new();
        for entity in drawing.visible_entities() {
            if self.is_stale(generation) {
                return None;
            }
            world_points.extend(entity.snap_points());
        }

        // 投影是纯计算，整批并行
        let projected: Vec<TransformedSnapPoint> = world_points
            .par_iter()
            .map(|sp| TransformedSnapPoint {
                world_point: sp.point,
                screen_point: snapshot.project(&sp.point),
                kind: sp.kind,
            })
            .collect();
        if self.is_stale(generation) {
            return None;
        }

        let mut tree = QuadTree::new(ScreenRect::from_corners(
            Point2::new(0.0, 0.0),
            Point2::new(snapshot.width, snapshot.height),
        ));
        for (i, p) in projected.into_iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && self.is_stale(generation) {
                return None;
            }
            tree.insert(p);
        }

        if self.is_stale(generation) {
            return None;
        }
        Some(tree)
    }

    fn publish(&self, generation: u64, tree: QuadTree) {
        let mut published = self.published.write().unwrap_or_else(|e| e.into_inner());
        // 只允许更新的代号覆盖已发布快照
        if generation > published.generation {
            debug!(generation, points = tree.len(), "捕捉点索引已发布");
            *published = Arc::new(IndexSnapshot { generation, tree });
        } else {
            debug!(
                generation,
                published = published.generation,
                "过期的捕捉点索引被丢弃"
            );
        }
    }
}

impl Default for SnapPointIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 候选排序 ==========

/// 返回屏幕距离光标最近的候选
///
/// 按批次调用取消探针；排序开始后新的指针事件到达时，
/// 调用方通过探针通知放弃，函数返回 None。
pub fn rank_candidates(
    candidates: &[TransformedSnapPoint],
    cursor: &Point2,
    mut cancelled: impl FnMut() -> bool,
) -> Option<TransformedSnapPoint> {
    const CHECK_INTERVAL: usize = 32;
    let mut best: Option<(f64, TransformedSnapPoint)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        if i % CHECK_INTERVAL == 0 && cancelled() {
            return None;
        }
        let dist_sq = (candidate.screen_point - cursor).norm_squared();
        match &best {
            Some((best_dist, _)) if dist_sq >= *best_dist => {}
            _ => best = Some((dist_sq, *candidate)),
        }
    }
    best.map(|(_, c)| c)
}

// ========== 测试 ==========

//! 实体定义
//!
//! 实体是文档模型中的最小编辑单元，按类分解为图元参与
//! 显示、捕捉与拾取。实体自身不可变：修改实体等价于
//! 用新实体替换旧实体。

use crate::geometry::{
    Primitive, PrimitiveBezier, PrimitiveEllipse, PrimitiveImage, PrimitiveLine, PrimitivePoint,
    PrimitiveText, SnapPoint,
};
use crate::math::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// 实体唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// 分配下一个可用 ID（进程内单调递增）
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 实体种类
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityKind {
    /// 直线段
    Line { p1: Point3, p2: Point3 },
    /// 圆
    Circle {
        center: Point3,
        radius: f64,
        normal: Vector3,
    },
    /// 圆弧（角度为度）
    Arc {
        center: Point3,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        normal: Vector3,
    },
    /// 定位点
    Location { point: Point3 },
    /// 多段线（直线段相连）
    Polyline { vertices: Vec<Point3> },
    /// 单行文本
    Text {
        location: Point3,
        value: String,
        height: f64,
        rotation: f64,
        normal: Vector3,
    },
    /// 样条曲线（控制点按三次贝塞尔分段解释）
    Spline { control_points: Vec<Point3> },
    /// 图像引用
    Image {
        location: Point3,
        path: String,
        width: f64,
        height: f64,
        rotation: f64,
    },
}

/// 实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl Entity {
    /// 创建实体并分配新 ID
    pub fn new(kind: EntityKind) -> Self {
        Self {
            id: EntityId::next(),
            kind,
        }
    }

    /// 直线实体
    pub fn line(p1: Point3, p2: Point3) -> Self {
        Self::new(EntityKind::Line { p1, p2 })
    }

    /// 圆实体（默认位于世界 XY 平面）
    pub fn circle(center: Point3, radius: f64) -> Self {
        Self::new(EntityKind::Circle {
            center,
            radius,
            normal: Vector3::z(),
        })
    }

    /// 定位点实体
    pub fn location(point: Point3) -> Self {
        Self::new(EntityKind::Location { point })
    }

    /// 获取实体的类型名称
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            EntityKind::Line { .. } => "Line",
            EntityKind::Circle { .. } => "Circle",
            EntityKind::Arc { .. } => "Arc",
            EntityKind::Location { .. } => "Location",
            EntityKind::Polyline { .. } => "Polyline",
            EntityKind::Text { .. } => "Text",
            EntityKind::Spline { .. } => "Spline",
            EntityKind::Image { .. } => "Image",
        }
    }

    /// 分解为图元
    pub fn primitives(&self) -> Vec<Primitive> {
        match &self.kind {
            EntityKind::Line { p1, p2 } => {
                vec![Primitive::Line(PrimitiveLine::new(*p1, *p2))]
            }
            EntityKind::Circle {
                center,
                radius,
                normal,
            } => vec![Primitive::Ellipse(PrimitiveEllipse::circle(
                *center, *radius, *normal,
            ))],
            EntityKind::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                normal,
            } => vec![Primitive::Ellipse(PrimitiveEllipse::arc(
                *center,
                *radius,
                *start_angle,
                *end_angle,
                *normal,
            ))],
            EntityKind::Location { point } => {
                vec![Primitive::Point(PrimitivePoint::new(*point))]
            }
            EntityKind::Polyline { vertices } => match vertices.len() {
                0 => Vec::new(),
                1 => vec![Primitive::Point(PrimitivePoint::new(vertices[0]))],
                _ => vertices
                    .windows(2)
                    .map(|w| Primitive::Line(PrimitiveLine::new(w[0], w[1])))
                    .collect(),
            },
            EntityKind::Text {
                location,
                value,
                height,
                rotation,
                normal,
            } => vec![Primitive::Text(PrimitiveText::new(
                *location,
                value.clone(),
                *height,
                *rotation,
                *normal,
            ))],
            EntityKind::Spline { control_points } => spline_primitives(control_points),
            EntityKind::Image {
                location,
                path,
                width,
                height,
                rotation,
            } => vec![Primitive::Image(PrimitiveImage::new(
                *location,
                path.clone(),
                *width,
                *height,
                *rotation,
            ))],
        }
    }

    /// 收集实体全部图元的捕捉点
    pub fn snap_points(&self) -> Vec<SnapPoint> {
        self.primitives()
            .iter()
            .flat_map(|p| p.snap_points())
            .collect()
    }

    /// 热点（夹点编辑的抓取位置）
    pub fn hot_points(&self) -> Vec<Point3> {
        match &self.kind {
            EntityKind::Line { p1, p2 } => {
                let mid = Point3::from((p1.coords + p2.coords) / 2.0);
                vec![*p1, mid, *p2]
            }
            EntityKind::Circle {
                center,
                radius,
                normal,
            } => {
                let c = PrimitiveEllipse::circle(*center, *radius, *normal);
                let mut pts = vec![*center];
                for angle in [0.0, 90.0, 180.0, 270.0] {
                    pts.push(c.point_at_angle(angle));
                }
                pts
            }
            EntityKind::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                normal,
            } => {
                let a = PrimitiveEllipse::arc(*center, *radius, *start_angle, *end_angle, *normal);
                vec![
                    *center,
                    a.point_at_angle(*start_angle),
                    a.point_at_angle(*start_angle + a.sweep() / 2.0),
                    a.point_at_angle(*end_angle),
                ]
            }
            EntityKind::Location { point } => vec![*point],
            EntityKind::Polyline { vertices } => vertices.clone(),
            EntityKind::Text { location, .. } => vec![*location],
            EntityKind::Spline { control_points } => control_points.clone(),
            EntityKind::Image { .. } => match &self.primitives()[..] {
                [Primitive::Image(img)] => img.corners().to_vec(),
                _ => Vec::new(),
            },
        }
    }
}

/// 样条控制点按共享端点的三次贝塞尔分段解释；
/// 不足一段时退化为折线。
fn spline_primitives(control_points: &[Point3]) -> Vec<Primitive> {
    if control_points.len() < 4 {
        return match control_points.len() {
            0 => Vec::new(),
            1 => vec![Primitive::Point(PrimitivePoint::new(control_points[0]))],
            _ => control_points
                .windows(2)
                .map(|w| Primitive::Line(PrimitiveLine::new(w[0], w[1])))
                .collect(),
        };
    }

    let mut primitives = Vec::new();
    let mut i = 0;
    while i + 3 < control_points.len() {
        primitives.push(Primitive::Bezier(PrimitiveBezier::new(
            control_points[i],
            control_points[i + 1],
            control_points[i + 2],
            control_points[i + 3],
        )));
        i += 3;
    }
    // 剩余不足一段的控制点退化为折线
    if i + 1 < control_points.len() {
        for w in control_points[i..].windows(2) {
            primitives.push(Primitive::Line(PrimitiveLine::new(w[0], w[1])));
        }
    }
    primitives
}

// ========== 测试 ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SnapPointKind;

    #[test]
    fn test_entity_id_unique() {
        let a = EntityId::next();
        let b = EntityId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_line_entity_primitives() {
        let e = Entity::line(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
        let prims = e.primitives();
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].kind_name(), "Line");
    }

    #[test]
    fn test_polyline_primitives_and_snaps() {
        let e = Entity::new(EntityKind::Polyline {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(10.0, 10.0, 0.0),
            ],
        });
        assert_eq!(e.primitives().len(), 2);
        // 每段 3 个捕捉点（两端点 + 中点）
        let snaps = e.snap_points();
        assert_eq!(snaps.len(), 6);
        assert!(snaps
            .iter()
            .any(|s| s.kind == SnapPointKind::MidPoint
                && (s.point - Point3::new(5.0, 0.0, 0.0)).norm() < 1e-9));
    }

    #[test]
    fn test_circle_hot_points() {
        let e = Entity::circle(Point3::new(0.0, 0.0, 0.0), 5.0);
        let hot = e.hot_points();
        // 圆心 + 4 象限
        assert_eq!(hot.len(), 5);
        assert!(hot
            .iter()
            .any(|p| (p - Point3::new(5.0, 0.0, 0.0)).norm() < 1e-9));
        assert!(hot
            .iter()
            .any(|p| (p - Point3::new(0.0, 5.0, 0.0)).norm() < 1e-9));
    }

    #[test]
    fn test_spline_bezier_split() {
        // 7 个控制点 = 两段共享端点的贝塞尔
        let pts: Vec<_> = (0..7).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        let e = Entity::new(EntityKind::Spline {
            control_points: pts,
        });
        let prims = e.primitives();
        assert_eq!(prims.len(), 2);
        assert!(prims.iter().all(|p| p.kind_name() == "Bezier"));
    }

    #[test]
    fn test_spline_short_fallback() {
        let e = Entity::new(EntityKind::Spline {
            control_points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
        });
        let prims = e.primitives();
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].kind_name(), "Line");
    }

    #[test]
    fn test_spline_remainder_as_lines() {
        // 6 个控制点 = 一段贝塞尔 + 两条退化直线
        let pts: Vec<_> = (0..6).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        let e = Entity::new(EntityKind::Spline {
            control_points: pts,
        });
        let prims = e.primitives();
        assert_eq!(prims.len(), 3);
        assert_eq!(prims[0].kind_name(), "Bezier");
        assert_eq!(prims[1].kind_name(), "Line");
    }
}

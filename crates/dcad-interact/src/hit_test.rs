//! 屏幕空间拾取
//!
//! 拾取在投影后的屏幕空间进行：每类图元有自己的最近点策略，
//! 全图最近的图元在拾取半径内时命中。距离相同时保留先遍历到
//! 的实体，实体按 ID 序遍历，结果确定。

use crate::viewport::ViewportSnapshot;
use dcad_core::drawing::Drawing;
use dcad_core::entity::Entity;
use dcad_core::geometry::Primitive;
use dcad_core::math::{closest_point_on_segment, Point2, Point3};

/// 拾取结果：实体本体与其上的选中点（世界坐标）
#[derive(Debug, Clone)]
pub struct SelectedEntity {
    pub entity: Entity,
    pub selection_point: Point3,
}

/// 图元上的最近屏幕点
#[derive(Debug, Clone, Copy)]
pub struct ClosestHit {
    pub screen: Point2,
    pub dist_sq: f64,
}

/// 在全部可见实体中拾取光标附近最近的实体
pub fn hit_test_drawing(
    drawing: &Drawing,
    snapshot: &ViewportSnapshot,
    cursor: &Point2,
    radius_px: f64,
) -> Option<SelectedEntity> {
    let mut best: Option<(f64, Point2, &Entity)> = None;
    for entity in drawing.visible_entities() {
        for primitive in entity.primitives() {
            if let Some(hit) = closest_point_on_primitive(&primitive, snapshot, cursor) {
                match &best {
                    Some((best_dist, _, _)) if hit.dist_sq >= *best_dist => {}
                    _ => best = Some((hit.dist_sq, hit.screen, entity)),
                }
            }
        }
    }

    let (dist_sq, screen, entity) = best?;
    if dist_sq <= radius_px * radius_px {
        Some(SelectedEntity {
            entity: entity.clone(),
            selection_point: snapshot.unproject(&screen),
        })
    } else {
        None
    }
}

/// 图元在屏幕空间中到光标的最近点
///
/// 策略按图元种类分派：
/// - 线段：投影后线段上的垂足
/// - 椭圆/贝塞尔：折线近似上的最近点
/// - 点标记：投影点本身
/// - 文本/图像：光标在四角内时距离为零，否则取最近边
pub fn closest_point_on_primitive(
    primitive: &Primitive,
    snapshot: &ViewportSnapshot,
    cursor: &Point2,
) -> Option<ClosestHit> {
    match primitive {
        Primitive::Line(line) => {
            let a = snapshot.project(&line.p1);
            let b = snapshot.project(&line.p2);
            let closest = closest_point_on_segment(&a, &b, cursor);
            Some(ClosestHit {
                screen: closest,
                dist_sq: (closest - cursor).norm_squared(),
            })
        }
        Primitive::Point(point) => {
            let p = snapshot.project(&point.location);
            Some(ClosestHit {
                screen: p,
                dist_sq: (p - cursor).norm_squared(),
            })
        }
        Primitive::Ellipse(_) | Primitive::Bezier(_) => {
            let projected: Vec<Point2> = primitive
                .sample_vertices()
                .iter()
                .map(|p| snapshot.project(p))
                .collect();
            closest_on_chain(&projected, cursor)
        }
        Primitive::Text(_) | Primitive::Image(_) => {
            let projected: Vec<Point2> = primitive
                .sample_vertices()
                .iter()
                .map(|p| snapshot.project(p))
                .collect();
            closest_on_quad(&projected, cursor)
        }
    }
}

/// 折线上的最近点
fn closest_on_chain(points: &[Point2], cursor: &Point2) -> Option<ClosestHit> {
    match points.len() {
        0 => None,
        1 => Some(ClosestHit {
            screen: points[0],
            dist_sq: (points[0] - cursor).norm_squared(),
        }),
        _ => {
            let mut best: Option<ClosestHit> = None;
            for w in points.windows(2) {
                let closest = closest_point_on_segment(&w[0], &w[1], cursor);
                let dist_sq = (closest - cursor).norm_squared();
                match &best {
                    Some(b) if dist_sq >= b.dist_sq => {}
                    _ => {
                        best = Some(ClosestHit {
                            screen: closest,
                            dist_sq,
                        })
                    }
                }
            }
            best
        }
    }
}

/// 四角区域的最近点：内部命中距离为零，外部取最近边
fn closest_on_quad(corners: &[Point2], cursor: &Point2) -> Option<ClosestHit> {
    if corners.len() != 4 {
        return closest_on_chain(corners, cursor);
    }
    if point_in_quad(corners, cursor) {
        return Some(ClosestHit {
            screen: *cursor,
            dist_sq: 0.0,
        });
    }

    let mut best: Option<ClosestHit> = None;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let closest = closest_point_on_segment(&a, &b, cursor);
        let dist_sq = (closest - cursor).norm_squared();
        match &best {
            Some(h) if dist_sq >= h.dist_sq => {}
            _ => {
                best = Some(ClosestHit {
                    screen: closest,
                    dist_sq,
                })
            }
        }
    }
    best
}

/// 凸四边形内部判断（叉积符号一致；投影可能翻转绕向，两个方向都接受）
fn point_in_quad(corners: &[Point2], cursor: &Point2) -> bool {
    let mut sign = 0.0_f64;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let cross = (b.x - a.x) * (cursor.y - a.y) - (b.y - a.y) * (cursor.x - a.x);
        if cross.abs() < 1e-12 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

// ========== 测试 ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::ViewPort;
    use dcad_core::entity::EntityKind;
    use dcad_core::math::{Point3, Vector3};

    fn snapshot_100() -> ViewportSnapshot {
        let vp = ViewPort::new(Point3::new(-50.0, -50.0, 0.0), 100.0);
        ViewportSnapshot::new(&vp, 100.0, 100.0).unwrap()
    }

    #[test]
    fn test_hit_line_within_radius() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        let id = drawing.add_entity(Entity::line(
            Point3::new(-10.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        ));

        // 光标在线段中点上方 5 像素
        let cursor = Point2::new(50.0, 45.0);
        let hit = hit_test_drawing(&drawing, &snapshot, &cursor, 10.0).expect("应命中");
        assert_eq!(hit.entity.id, id);
        // 选中点是线段上的垂足（世界原点附近）
        assert!((hit.selection_point - Point3::origin()).norm() < 1e-9);

        // 超出拾取半径
        let far = Point2::new(50.0, 30.0);
        assert!(hit_test_drawing(&drawing, &snapshot, &far, 10.0).is_none());
    }

    #[test]
    fn test_hit_circle_rim_not_center() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        drawing.add_entity(Entity::circle(Point3::origin(), 30.0));

        // 圆心不在曲线上：到圆周 30 像素，半径 10 不命中
        let center = Point2::new(50.0, 50.0);
        assert!(hit_test_drawing(&drawing, &snapshot, &center, 10.0).is_none());

        // 圆周附近命中
        let rim = Point2::new(50.0 + 28.0, 50.0);
        assert!(hit_test_drawing(&drawing, &snapshot, &rim, 10.0).is_some());
    }

    #[test]
    fn test_hit_text_interior_zero_distance() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        drawing.add_entity(Entity::new(EntityKind::Text {
            location: Point3::origin(),
            value: "abcd".to_string(),
            height: 10.0,
            rotation: 0.0,
            normal: Vector3::z(),
        }));

        // 文本四角内部即使拾取半径极小也命中
        let inside = Point2::new(55.0, 45.0);
        let hit = hit_test_drawing(&drawing, &snapshot, &inside, 0.5);
        assert!(hit.is_some());

        // 远离四角不命中
        let outside = Point2::new(90.0, 90.0);
        assert!(hit_test_drawing(&drawing, &snapshot, &outside, 0.5).is_none());
    }

    #[test]
    fn test_nearest_entity_wins() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        let _far = drawing.add_entity(Entity::line(
            Point3::new(-10.0, 8.0, 0.0),
            Point3::new(10.0, 8.0, 0.0),
        ));
        let near = drawing.add_entity(Entity::line(
            Point3::new(-10.0, 2.0, 0.0),
            Point3::new(10.0, 2.0, 0.0),
        ));

        let cursor = Point2::new(50.0, 50.0);
        let hit = hit_test_drawing(&drawing, &snapshot, &cursor, 10.0).expect("应命中");
        assert_eq!(hit.entity.id, near);
    }

    #[test]
    fn test_equidistant_tie_is_deterministic() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        // 两条线到光标的屏幕距离都是 4 像素
        let first = drawing.add_entity(Entity::line(
            Point3::new(-10.0, 4.0, 0.0),
            Point3::new(10.0, 4.0, 0.0),
        ));
        let _second = drawing.add_entity(Entity::line(
            Point3::new(-10.0, -4.0, 0.0),
            Point3::new(10.0, -4.0, 0.0),
        ));

        let cursor = Point2::new(50.0, 50.0);
        let a = hit_test_drawing(&drawing, &snapshot, &cursor, 10.0).expect("应命中");
        let b = hit_test_drawing(&drawing, &snapshot, &cursor, 10.0).expect("应命中");
        // 并列时按实体 ID 序保留先遍历到的，重复拾取结果一致
        assert_eq!(a.entity.id, first);
        assert_eq!(b.entity.id, first);
        assert!((a.selection_point - b.selection_point).norm() < 1e-12);
        assert!((a.selection_point - Point3::new(0.0, 4.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_hit_bezier_chain() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        // 控制点共线的贝塞尔退化为直线段
        drawing.add_entity(Entity::new(EntityKind::Spline {
            control_points: vec![
                Point3::new(-30.0, 0.0, 0.0),
                Point3::new(-10.0, 0.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(30.0, 0.0, 0.0),
            ],
        }));

        let cursor = Point2::new(50.0, 47.0);
        assert!(hit_test_drawing(&drawing, &snapshot, &cursor, 5.0).is_some());
        let far = Point2::new(50.0, 30.0);
        assert!(hit_test_drawing(&drawing, &snapshot, &far, 5.0).is_none());
    }

    #[test]
    fn test_hidden_layer_not_hit() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        drawing.add_layer("隐藏层");
        drawing.set_current_layer("隐藏层");
        drawing.add_entity(Entity::line(
            Point3::new(-10.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        ));
        drawing.set_layer_visible("隐藏层", false);

        let cursor = Point2::new(50.0, 50.0);
        assert!(hit_test_drawing(&drawing, &snapshot, &cursor, 10.0).is_none());
    }
}

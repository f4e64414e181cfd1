//! 矩形选择
//!
//! 第一次落点后拖出屏幕空间矩形：向右拖为窗选（实体全部
//! 顶点都在框内才入选），向左拖为叉选（任一顶点在框内或
//! 任一边与框相交即入选）。叉选的结果恒为窗选结果的超集。

use crate::viewport::ViewportSnapshot;
use dcad_core::drawing::Drawing;
use dcad_core::entity::Entity;
use dcad_core::math::{Point2, Point3, ScreenRect};

/// 选择模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// 窗选：完整包含
    WholeEntity,
    /// 叉选：部分相交
    PartialEntity,
}

impl SelectionMode {
    /// 由拖拽方向推导：向右窗选，向左叉选
    pub fn from_drag(start_x: f64, current_x: f64) -> Self {
        if current_x >= start_x {
            SelectionMode::WholeEntity
        } else {
            SelectionMode::PartialEntity
        }
    }
}

/// 进行中的选择框状态（屏幕空间）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionState {
    pub rectangle: ScreenRect,
    pub mode: SelectionMode,
}

/// 完成的选择框：屏幕矩形与两角的世界坐标
#[derive(Debug, Clone)]
pub struct SelectionRectangle {
    pub screen: ScreenRect,
    pub world_corner1: Point3,
    pub world_corner2: Point3,
}

/// 按选择框枚举命中的可见实体
pub fn entities_in_rectangle(
    drawing: &Drawing,
    snapshot: &ViewportSnapshot,
    state: &SelectionState,
) -> Vec<Entity> {
    drawing
        .visible_entities()
        .filter(|entity| match state.mode {
            SelectionMode::WholeEntity => entity_fully_inside(entity, snapshot, &state.rectangle),
            SelectionMode::PartialEntity => entity_intersects(entity, snapshot, &state.rectangle),
        })
        .cloned()
        .collect()
}

/// 窗选判定：实体所有图元的全部投影顶点都在框内
fn entity_fully_inside(entity: &Entity, snapshot: &ViewportSnapshot, rect: &ScreenRect) -> bool {
    let mut has_vertices = false;
    for primitive in entity.primitives() {
        for vertex in primitive.sample_vertices() {
            has_vertices = true;
            if !rect.contains(&snapshot.project(&vertex)) {
                return false;
            }
        }
    }
    has_vertices
}

/// 叉选判定：任一投影顶点在框内，或任一图元边与框相交
fn entity_intersects(entity: &Entity, snapshot: &ViewportSnapshot, rect: &ScreenRect) -> bool {
    for primitive in entity.primitives() {
        let projected: Vec<Point2> = primitive
            .sample_vertices()
            .iter()
            .map(|v| snapshot.project(v))
            .collect();

        for p in &projected {
            if rect.contains(p) {
                return true;
            }
        }

        for w in projected.windows(2) {
            if rect.intersects_segment(&w[0], &w[1]) {
                return true;
            }
        }
        // 闭合轮廓补最后一条回环边
        if primitive.is_closed_outline() && projected.len() > 2 {
            let first = projected[0];
            let last = projected[projected.len() - 1];
            if rect.intersects_segment(&last, &first) {
                return true;
            }
        }
    }
    false
}

// ========== 测试 ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::ViewPort;
    use dcad_core::entity::EntityKind;
    use dcad_core::math::Vector3;

    fn snapshot_100() -> ViewportSnapshot {
        let vp = ViewPort::new(Point3::new(-50.0, -50.0, 0.0), 100.0);
        ViewportSnapshot::new(&vp, 100.0, 100.0).unwrap()
    }

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> ScreenRect {
        ScreenRect::from_corners(Point2::new(x1, y1), Point2::new(x2, y2))
    }

    fn sample_drawing() -> (Drawing, dcad_core::entity::EntityId, dcad_core::entity::EntityId) {
        let mut drawing = Drawing::new();
        // 完全落在屏幕中心区域的线段：世界 (-10,0)→(10,0) = 屏幕 (40,50)→(60,50)
        let inside = drawing.add_entity(Entity::line(
            Point3::new(-10.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        ));
        // 横穿选择框的长线段：屏幕 (10,45)→(90,45)
        let straddling = drawing.add_entity(Entity::line(
            Point3::new(-40.0, 5.0, 0.0),
            Point3::new(40.0, 5.0, 0.0),
        ));
        (drawing, inside, straddling)
    }

    #[test]
    fn test_window_mode_requires_full_containment() {
        let snapshot = snapshot_100();
        let (drawing, inside, _straddling) = sample_drawing();

        let state = SelectionState {
            rectangle: rect(30.0, 35.0, 70.0, 60.0),
            mode: SelectionMode::WholeEntity,
        };
        let selected = entities_in_rectangle(&drawing, &snapshot, &state);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, inside);
    }

    #[test]
    fn test_crossing_mode_includes_straddling() {
        let snapshot = snapshot_100();
        let (drawing, _, _) = sample_drawing();

        let state = SelectionState {
            rectangle: rect(30.0, 35.0, 70.0, 60.0),
            mode: SelectionMode::PartialEntity,
        };
        let selected = entities_in_rectangle(&drawing, &snapshot, &state);
        // 叉选包含完全在内的与横穿的
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_crossing_is_superset_of_window() {
        let snapshot = snapshot_100();
        let (drawing, _, _) = sample_drawing();
        let rectangle = rect(30.0, 35.0, 70.0, 60.0);

        let window = entities_in_rectangle(
            &drawing,
            &snapshot,
            &SelectionState {
                rectangle,
                mode: SelectionMode::WholeEntity,
            },
        );
        let crossing = entities_in_rectangle(
            &drawing,
            &snapshot,
            &SelectionState {
                rectangle,
                mode: SelectionMode::PartialEntity,
            },
        );
        for e in &window {
            assert!(crossing.iter().any(|c| c.id == e.id));
        }
    }

    #[test]
    fn test_mode_from_drag_direction() {
        assert_eq!(SelectionMode::from_drag(10.0, 50.0), SelectionMode::WholeEntity);
        assert_eq!(SelectionMode::from_drag(50.0, 10.0), SelectionMode::PartialEntity);
    }

    #[test]
    fn test_crossing_inside_circle_selects_nothing() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        drawing.add_entity(Entity::circle(Point3::origin(), 40.0));

        // 选择框完全在圆内：无顶点入框、无边相交
        let state = SelectionState {
            rectangle: rect(45.0, 45.0, 55.0, 55.0),
            mode: SelectionMode::PartialEntity,
        };
        assert!(entities_in_rectangle(&drawing, &snapshot, &state).is_empty());
    }

    #[test]
    fn test_text_closing_edge_crossing() {
        let snapshot = snapshot_100();
        let mut drawing = Drawing::new();
        // 文本四角：屏幕 (50,40)-(74,50)
        drawing.add_entity(Entity::new(EntityKind::Text {
            location: Point3::origin(),
            value: "abcd".to_string(),
            height: 10.0,
            rotation: 0.0,
            normal: Vector3::z(),
        }));

        // 只与回环边（左边缘）相交的选择框
        let state = SelectionState {
            rectangle: rect(40.0, 42.0, 52.0, 48.0),
            mode: SelectionMode::PartialEntity,
        };
        assert_eq!(entities_in_rectangle(&drawing, &snapshot, &state).len(), 1);
    }
}

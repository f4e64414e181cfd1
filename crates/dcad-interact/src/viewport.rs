//! 视口与世界/屏幕变换
//!
//! 视口由世界坐标的左下角与可见视高定义，宽度随控件宽高比推导。
//! 每次指针事件开始时取一份变换快照，事件内的全部投影/反投影
//! 都使用同一快照，避免处理过程中视口变化造成的不一致。

use dcad_core::math::{Matrix4, Point2, Point3};
use thiserror::Error;

/// 视图变换错误
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("视口尺寸退化（宽 {width} × 高 {height}），无法构建变换")]
    DegenerateSurface { width: f64, height: f64 },
    #[error("视高 {view_height} 退化，无法构建变换")]
    DegenerateViewHeight { view_height: f64 },
    #[error("视图变换不可逆")]
    NotInvertible,
}

/// 视口：世界坐标中的可见区域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPort {
    /// 可见区域左下角（世界坐标）
    pub bottom_left: Point3,
    /// 可见区域高度（世界单位）
    pub view_height: f64,
}

impl ViewPort {
    pub fn new(bottom_left: Point3, view_height: f64) -> Self {
        Self {
            bottom_left,
            view_height,
        }
    }

    /// 按宽高比推导可见宽度
    pub fn view_width(&self, aspect: f64) -> f64 {
        self.view_height * aspect
    }

    /// 以光标为锚点缩放
    ///
    /// `delta > 0` 放大（视高变小）。缩放后光标处的世界点继续
    /// 落在同一屏幕位置。
    pub fn zoomed_about(
        &self,
        snapshot: &ViewportSnapshot,
        cursor: Point2,
        delta: f64,
        zoom_scale: f64,
    ) -> ViewPort {
        let factor = if delta > 0.0 {
            1.0 / zoom_scale
        } else {
            zoom_scale
        };
        let new_height = self.view_height * factor;
        let new_width = new_height * snapshot.width / snapshot.height;

        let cursor_world = snapshot.unproject(&cursor);
        let rel_x = cursor.x / snapshot.width;
        let rel_y = (snapshot.height - cursor.y) / snapshot.height;

        ViewPort {
            bottom_left: Point3::new(
                cursor_world.x - rel_x * new_width,
                cursor_world.y - rel_y * new_height,
                self.bottom_left.z,
            ),
            view_height: new_height,
        }
    }

    /// 按屏幕像素位移平移（dx 向右为正，dy 向下为正）
    pub fn panned(&self, dx: f64, dy: f64, surface_height: f64) -> ViewPort {
        let world_per_pixel = self.view_height / surface_height;
        ViewPort {
            bottom_left: Point3::new(
                self.bottom_left.x - dx * world_per_pixel,
                self.bottom_left.y + dy * world_per_pixel,
                self.bottom_left.z,
            ),
            view_height: self.view_height,
        }
    }

    /// 构造恰好容纳世界矩形的视口；矩形退化时返回 None
    pub fn fitted_to(corner1: Point3, corner2: Point3, aspect: f64) -> Option<ViewPort> {
        let min_x = corner1.x.min(corner2.x);
        let max_x = corner1.x.max(corner2.x);
        let min_y = corner1.y.min(corner2.y);
        let max_y = corner1.y.max(corner2.y);

        let dx = max_x - min_x;
        let dy = max_y - min_y;
        if (dx <= 0.0 && dy <= 0.0) || aspect <= 0.0 {
            return None;
        }

        // 取能同时容纳宽和高的视高
        let view_height = dy.max(dx / aspect);
        if view_height <= 0.0 {
            return None;
        }

        // 沿较短方向居中
        let view_width = view_height * aspect;
        let bottom_left = Point3::new(
            min_x - (view_width - dx) / 2.0,
            min_y - (view_height - dy) / 2.0,
            corner1.z,
        );
        Some(ViewPort::new(bottom_left, view_height))
    }
}

impl Default for ViewPort {
    fn default() -> Self {
        Self {
            bottom_left: Point3::new(0.0, 0.0, 0.0),
            view_height: 100.0,
        }
    }
}

/// 变换快照：单次事件内一致的世界↔屏幕映射
///
/// 屏幕坐标原点在左上角，y 轴向下。
#[derive(Debug, Clone)]
pub struct ViewportSnapshot {
    matrix: Matrix4,
    inverse: Matrix4,
    pub width: f64,
    pub height: f64,
}

impl ViewportSnapshot {
    pub fn new(viewport: &ViewPort, width: f64, height: f64) -> Result<Self, TransformError> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(TransformError::DegenerateSurface { width, height });
        }
        if !(viewport.view_height > 0.0) {
            return Err(TransformError::DegenerateViewHeight {
                view_height: viewport.view_height,
            });
        }

        let scale = height / viewport.view_height;
        let bl = viewport.bottom_left;
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            scale, 0.0,    0.0,   -scale * bl.x,
            0.0,   -scale, 0.0,   scale * bl.y + height,
            0.0,   0.0,    scale, 0.0,
            0.0,   0.0,    0.0,   1.0,
        );
        let inverse = matrix.try_inverse().ok_or(TransformError::NotInvertible)?;

        Ok(Self {
            matrix,
            inverse,
            width,
            height,
        })
    }

    /// 世界坐标投影到屏幕像素
    pub fn project(&self, p: &Point3) -> Point2 {
        let t = self.matrix.transform_point(p);
        Point2::new(t.x, t.y)
    }

    /// 屏幕像素反投影到世界坐标（落在 z=0 的视平面上）
    pub fn unproject(&self, p: &Point2) -> Point3 {
        self.inverse
            .transform_point(&Point3::new(p.x, p.y, 0.0))
    }
}

// ========== 测试 ==========

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_100() -> (ViewPort, ViewportSnapshot) {
        // 100x100 屏幕，视高 100 → 1 像素 = 1 世界单位
        let vp = ViewPort::new(Point3::new(-50.0, -50.0, 0.0), 100.0);
        let snap = ViewportSnapshot::new(&vp, 100.0, 100.0).unwrap();
        (vp, snap)
    }

    #[test]
    fn test_project_flips_y() {
        let (_, snap) = snapshot_100();
        // 左下角 → 屏幕左下 (0, height)
        let p = snap.project(&Point3::new(-50.0, -50.0, 0.0));
        assert!((p - Point2::new(0.0, 100.0)).norm() < 1e-9);
        // 世界原点 → 屏幕中心
        let c = snap.project(&Point3::origin());
        assert!((c - Point2::new(50.0, 50.0)).norm() < 1e-9);
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let (_, snap) = snapshot_100();
        for world in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(12.5, -3.75, 0.0),
            Point3::new(-49.0, 49.0, 0.0),
        ] {
            let screen = snap.project(&world);
            let back = snap.unproject(&screen);
            assert!((back - world).norm() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_surface_rejected() {
        let vp = ViewPort::default();
        assert!(matches!(
            ViewportSnapshot::new(&vp, 0.0, 100.0),
            Err(TransformError::DegenerateSurface { .. })
        ));
        let bad = ViewPort::new(Point3::origin(), 0.0);
        assert!(matches!(
            ViewportSnapshot::new(&bad, 100.0, 100.0),
            Err(TransformError::DegenerateViewHeight { .. })
        ));
    }

    #[test]
    fn test_zoom_keeps_cursor_anchored() {
        let (vp, snap) = snapshot_100();
        let cursor = Point2::new(75.0, 25.0);
        let world_before = snap.unproject(&cursor);

        let zoomed = vp.zoomed_about(&snap, cursor, 1.0, 1.25);
        assert!(zoomed.view_height < vp.view_height);

        let snap2 = ViewportSnapshot::new(&zoomed, 100.0, 100.0).unwrap();
        let screen_after = snap2.project(&world_before);
        assert!((screen_after - cursor).norm() < 1e-9);
    }

    #[test]
    fn test_zoom_out_grows_view() {
        let (vp, snap) = snapshot_100();
        let zoomed = vp.zoomed_about(&snap, Point2::new(50.0, 50.0), -1.0, 1.25);
        assert!((zoomed.view_height - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_pan_follows_pointer() {
        let (vp, _) = snapshot_100();
        // 指针向右拖 10 像素：内容随指针右移，视口左移
        let panned = vp.panned(10.0, 0.0, 100.0);
        assert!((panned.bottom_left.x - (-60.0)).abs() < 1e-9);
        // 指针向下拖 10 像素：视口上移
        let panned = vp.panned(0.0, 10.0, 100.0);
        assert!((panned.bottom_left.y - (-40.0)).abs() < 1e-9);
    }

    #[test]
    fn test_fitted_to_rect() {
        let vp = ViewPort::fitted_to(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(40.0, 20.0, 0.0),
            2.0,
        )
        .unwrap();
        // 宽 40 / 宽高比 2 = 视高 20，恰好同时容纳
        assert!((vp.view_height - 20.0).abs() < 1e-9);
        assert!((vp.bottom_left.x - 0.0).abs() < 1e-9);

        // 退化矩形
        assert!(ViewPort::fitted_to(Point3::origin(), Point3::origin(), 2.0).is_none());
    }
}

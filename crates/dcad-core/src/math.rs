//! 数学基础
//!
//! 基于 nalgebra 的类型别名、数值常量与绘图平面。
//! 所有坐标使用 f64，角度除特别说明外均以度为单位。

use serde::{Deserialize, Serialize};

/// 二维点（屏幕空间常用）
pub type Point2 = nalgebra::Point2<f64>;
/// 三维点（世界空间）
pub type Point3 = nalgebra::Point3<f64>;
/// 二维向量
pub type Vector2 = nalgebra::Vector2<f64>;
/// 三维向量
pub type Vector3 = nalgebra::Vector3<f64>;
/// 4x4 齐次变换矩阵
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// 几何比较容差
pub const EPSILON: f64 = 1e-10;

/// 角度转弧度
#[inline]
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

/// 将角度规范化到 [0, 360)
pub fn normalize_angle(deg: f64) -> f64 {
    let mut a = deg % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    a
}

// ========== 屏幕矩形 ==========

/// 屏幕空间轴对齐矩形（像素坐标，构造时规范化为 min/max）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: Point2,
    pub max: Point2,
}

impl ScreenRect {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// 由任意两个对角构造，自动规范化
    pub fn from_corners(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// 以中心点与半边长构造正方形区域
    pub fn around(center: Point2, half_extent: f64) -> Self {
        Self {
            min: Point2::new(center.x - half_extent, center.y - half_extent),
            max: Point2::new(center.x + half_extent, center.y + half_extent),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// 点是否在矩形内（含边界）
    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// 两矩形是否相交（含相切）
    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// 线段是否与矩形相交（任一端点在内，或与任一边相交）
    pub fn intersects_segment(&self, a: &Point2, b: &Point2) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        let tl = Point2::new(self.min.x, self.max.y);
        let br = Point2::new(self.max.x, self.min.y);
        segments_intersect(a, b, &self.min, &tl)
            || segments_intersect(a, b, &tl, &self.max)
            || segments_intersect(a, b, &self.max, &br)
            || segments_intersect(a, b, &br, &self.min)
    }
}

// ========== 二维线段运算 ==========

/// 线段上最近点
///
/// 返回线段 ab 上到 p 最近的点；退化线段返回端点 a。
pub fn closest_point_on_segment(a: &Point2, b: &Point2, p: &Point2) -> Point2 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// 两线段是否相交（含端点接触与共线重叠）
pub fn segments_intersect(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2) -> bool {
    fn orient(p: &Point2, q: &Point2, r: &Point2) -> f64 {
        (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
    }
    fn on_segment(p: &Point2, q: &Point2, r: &Point2) -> bool {
        r.x >= p.x.min(q.x) - EPSILON
            && r.x <= p.x.max(q.x) + EPSILON
            && r.y >= p.y.min(q.y) - EPSILON
            && r.y <= p.y.max(q.y) + EPSILON
    }

    let d1 = orient(a1, a2, b1);
    let d2 = orient(a1, a2, b2);
    let d3 = orient(b1, b2, a1);
    let d4 = orient(b1, b2, a2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // 共线情形
    (d1.abs() < EPSILON && on_segment(a1, a2, b1))
        || (d2.abs() < EPSILON && on_segment(a1, a2, b2))
        || (d3.abs() < EPSILON && on_segment(b1, b2, a1))
        || (d4.abs() < EPSILON && on_segment(b1, b2, a2))
}

// ========== 绘图平面 ==========

/// 绘图平面
///
/// 由原点与平面内两条正交单位轴定义。正交模式与角度捕捉
/// 都在当前绘图平面内计算，而不是固定在世界 XY 平面。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingPlane {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
}

impl DrawingPlane {
    pub fn new(origin: Point3, x_axis: Vector3, y_axis: Vector3) -> Self {
        Self {
            origin,
            x_axis,
            y_axis,
        }
    }

    /// 世界 XY 平面
    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vector3::x(), Vector3::y())
    }

    /// 世界 XZ 平面
    pub fn xz() -> Self {
        Self::new(Point3::origin(), Vector3::x(), Vector3::z())
    }

    /// 世界 YZ 平面
    pub fn yz() -> Self {
        Self::new(Point3::origin(), Vector3::y(), Vector3::z())
    }

    /// 平面法向
    pub fn normal(&self) -> Vector3 {
        self.x_axis.cross(&self.y_axis)
    }

    /// 将向量分解为平面内分量 (u, v)
    pub fn components(&self, v: &Vector3) -> (f64, f64) {
        (v.dot(&self.x_axis), v.dot(&self.y_axis))
    }

    /// 由平面内分量合成世界向量
    pub fn from_components(&self, u: f64, v: f64) -> Vector3 {
        self.x_axis * u + self.y_axis * v
    }

    /// 平面内指定角度（度）的单位方向
    pub fn direction_at(&self, angle_deg: f64) -> Vector3 {
        let rad = deg_to_rad(angle_deg);
        self.from_components(rad.cos(), rad.sin())
    }
}

/// 由法向构造平面内正交基（任意轴算法）
///
/// 法向接近世界 Z 轴时参考 Y 轴，否则参考 Z 轴，
/// 保证结果随法向连续且与 DXF 约定一致。
pub fn arbitrary_axes(normal: &Vector3) -> (Vector3, Vector3) {
    let n = if normal.norm() < EPSILON {
        Vector3::z()
    } else {
        normal.normalize()
    };
    let reference = if n.x.abs() < 1.0 / 64.0 && n.y.abs() < 1.0 / 64.0 {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let x_axis = reference.cross(&n).normalize();
    let y_axis = n.cross(&x_axis);
    (x_axis, y_axis)
}

impl Default for DrawingPlane {
    fn default() -> Self {
        Self::xy()
    }
}

// ========== 测试 ==========

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(370.0) - 10.0).abs() < EPSILON);
        assert!((normalize_angle(-90.0) - 270.0).abs() < EPSILON);
        assert!((normalize_angle(360.0) - 0.0).abs() < EPSILON);
    }

    #[test]
    fn test_screen_rect_from_corners() {
        // 任意对角顺序都规范化为 min/max
        let r = ScreenRect::from_corners(Point2::new(10.0, 2.0), Point2::new(3.0, 8.0));
        assert_eq!(r.min, Point2::new(3.0, 2.0));
        assert_eq!(r.max, Point2::new(10.0, 8.0));
        assert!(r.contains(&Point2::new(5.0, 5.0)));
        assert!(!r.contains(&Point2::new(2.0, 5.0)));
    }

    #[test]
    fn test_segment_rect_intersection() {
        let r = ScreenRect::from_corners(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        // 横穿矩形、两端点都在外
        assert!(r.intersects_segment(&Point2::new(-5.0, 5.0), &Point2::new(15.0, 5.0)));
        // 完全在外
        assert!(!r.intersects_segment(&Point2::new(-5.0, 20.0), &Point2::new(15.0, 20.0)));
        // 一端在内
        assert!(r.intersects_segment(&Point2::new(5.0, 5.0), &Point2::new(15.0, 20.0)));
    }

    #[test]
    fn test_closest_point_on_segment() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        // 垂足在线段内
        let c = closest_point_on_segment(&a, &b, &Point2::new(5.0, 3.0));
        assert!((c - Point2::new(5.0, 0.0)).norm() < EPSILON);
        // 垂足超出端点时截断
        let c = closest_point_on_segment(&a, &b, &Point2::new(20.0, 3.0));
        assert!((c - b).norm() < EPSILON);
    }

    #[test]
    fn test_segments_intersect() {
        let p = |x, y| Point2::new(x, y);
        assert!(segments_intersect(
            &p(0.0, 0.0),
            &p(10.0, 10.0),
            &p(0.0, 10.0),
            &p(10.0, 0.0)
        ));
        assert!(!segments_intersect(
            &p(0.0, 0.0),
            &p(10.0, 0.0),
            &p(0.0, 5.0),
            &p(10.0, 5.0)
        ));
        // 端点接触
        assert!(segments_intersect(
            &p(0.0, 0.0),
            &p(5.0, 5.0),
            &p(5.0, 5.0),
            &p(10.0, 0.0)
        ));
    }

    #[test]
    fn test_drawing_plane_components() {
        let plane = DrawingPlane::xy();
        let (u, v) = plane.components(&Vector3::new(3.0, 7.0, 2.0));
        assert!((u - 3.0).abs() < EPSILON);
        assert!((v - 7.0).abs() < EPSILON);
        let back = plane.from_components(u, v);
        assert!((back - Vector3::new(3.0, 7.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn test_drawing_plane_direction() {
        let plane = DrawingPlane::xy();
        let d = plane.direction_at(90.0);
        assert!((d - Vector3::y()).norm() < 1e-9);
    }

    #[test]
    fn test_arbitrary_axes_orthonormal() {
        for n in [
            Vector3::z(),
            Vector3::x(),
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, -1.0),
        ] {
            let (x, y) = arbitrary_axes(&n);
            assert!((x.norm() - 1.0).abs() < 1e-9);
            assert!((y.norm() - 1.0).abs() < 1e-9);
            assert!(x.dot(&y).abs() < 1e-9);
            assert!(x.dot(&n.normalize()).abs() < 1e-9);
        }
    }
}

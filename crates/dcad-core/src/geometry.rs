//! 渲染/交互图元定义
//!
//! 实体在显示与拾取前被分解为少量图元类型：
//! - 线段 (Line)
//! - 椭圆/椭圆弧 (Ellipse)，圆与圆弧是短轴比为 1 的特例
//! - 点标记 (Point)
//! - 文本 (Text)
//! - 三次贝塞尔 (Bezier)
//! - 图像 (Image)
//!
//! 图元集合是封闭的：所有按类分派（捕捉点、顶点采样、最近点）
//! 都使用穷尽 match，新增图元种类必须同时补齐全部分派点。

use crate::math::{
    arbitrary_axes, deg_to_rad, normalize_angle, Point3, Vector3, EPSILON,
};
use serde::{Deserialize, Serialize};

/// 椭圆弧的采样步长（度）
pub const ARC_SAMPLE_STEP_DEG: f64 = 1.0;
/// 贝塞尔曲线折线近似的分段数
pub const BEZIER_SAMPLE_SEGMENTS: usize = 32;

// ========== 捕捉点 ==========

/// 捕捉点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapPointKind {
    /// 无特定类型
    None,
    /// 圆心/椭圆中心
    Center,
    /// 端点
    EndPoint,
    /// 中点
    MidPoint,
    /// 象限点
    Quadrant,
    /// 焦点
    Focus,
}

impl SnapPointKind {
    /// 获取类型的中文名称
    pub fn name(&self) -> &'static str {
        match self {
            SnapPointKind::None => "无",
            SnapPointKind::Center => "圆心",
            SnapPointKind::EndPoint => "端点",
            SnapPointKind::MidPoint => "中点",
            SnapPointKind::Quadrant => "象限点",
            SnapPointKind::Focus => "焦点",
        }
    }
}

/// 捕捉点（世界坐标）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapPoint {
    pub point: Point3,
    pub kind: SnapPointKind,
}

impl SnapPoint {
    pub fn new(point: Point3, kind: SnapPointKind) -> Self {
        Self { point, kind }
    }
}

// ========== 图元 ==========

/// 图元类型枚举
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Primitive {
    Line(PrimitiveLine),
    Ellipse(PrimitiveEllipse),
    Point(PrimitivePoint),
    Text(PrimitiveText),
    Bezier(PrimitiveBezier),
    Image(PrimitiveImage),
}

impl Primitive {
    /// 获取图元的类型名称
    pub fn kind_name(&self) -> &'static str {
        match self {
            Primitive::Line(_) => "Line",
            Primitive::Ellipse(_) => "Ellipse",
            Primitive::Point(_) => "Point",
            Primitive::Text(_) => "Text",
            Primitive::Bezier(_) => "Bezier",
            Primitive::Image(_) => "Image",
        }
    }

    /// 收集图元的捕捉点
    pub fn snap_points(&self) -> Vec<SnapPoint> {
        match self {
            Primitive::Line(l) => l.snap_points(),
            Primitive::Ellipse(e) => e.snap_points(),
            Primitive::Point(p) => vec![SnapPoint::new(p.location, SnapPointKind::EndPoint)],
            Primitive::Text(t) => vec![SnapPoint::new(t.location, SnapPointKind::EndPoint)],
            Primitive::Bezier(b) => b.snap_points(),
            Primitive::Image(i) => i
                .corners()
                .iter()
                .map(|c| SnapPoint::new(*c, SnapPointKind::EndPoint))
                .collect(),
        }
    }

    /// 采样图元顶点（世界坐标）
    ///
    /// 线段返回端点，曲线返回折线近似顶点，文本/图像返回四角。
    /// 窗选包含性判断与屏幕空间拾取都基于该顶点序列。
    pub fn sample_vertices(&self) -> Vec<Point3> {
        match self {
            Primitive::Line(l) => vec![l.p1, l.p2],
            Primitive::Ellipse(e) => e.sample_polyline(),
            Primitive::Point(p) => vec![p.location],
            Primitive::Text(t) => t.corners().to_vec(),
            Primitive::Bezier(b) => b.sample_polyline(),
            Primitive::Image(i) => i.corners().to_vec(),
        }
    }

    /// 采样顶点是否构成闭合环（文本/图像四角、整圆）
    pub fn is_closed_outline(&self) -> bool {
        match self {
            Primitive::Text(_) | Primitive::Image(_) => true,
            Primitive::Ellipse(e) => e.is_full(),
            _ => false,
        }
    }
}

/// 线段图元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveLine {
    pub p1: Point3,
    pub p2: Point3,
}

impl PrimitiveLine {
    pub fn new(p1: Point3, p2: Point3) -> Self {
        Self { p1, p2 }
    }

    /// 线段长度
    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).norm()
    }

    /// 线段中点
    pub fn midpoint(&self) -> Point3 {
        Point3::from((self.p1.coords + self.p2.coords) / 2.0)
    }

    fn snap_points(&self) -> Vec<SnapPoint> {
        vec![
            SnapPoint::new(self.p1, SnapPointKind::EndPoint),
            SnapPoint::new(self.p2, SnapPointKind::EndPoint),
            SnapPoint::new(self.midpoint(), SnapPointKind::MidPoint),
        ]
    }
}

/// 椭圆/椭圆弧图元
///
/// 由中心、长半轴向量、短长轴比与起止角（度）定义。
/// 圆是短轴比为 1 的特例；整圆/整椭圆的起止角为 0..360。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveEllipse {
    pub center: Point3,
    /// 长半轴向量：从中心指向 0° 参数点，模长为长半轴
    pub major_axis: Vector3,
    /// 短半轴与长半轴之比，(0, 1]
    pub minor_ratio: f64,
    /// 起始角（度）
    pub start_angle: f64,
    /// 终止角（度）
    pub end_angle: f64,
    /// 所在平面法向
    pub normal: Vector3,
}

impl PrimitiveEllipse {
    pub fn new(
        center: Point3,
        major_axis: Vector3,
        minor_ratio: f64,
        start_angle: f64,
        end_angle: f64,
        normal: Vector3,
    ) -> Self {
        Self {
            center,
            major_axis,
            minor_ratio,
            start_angle,
            end_angle,
            normal,
        }
    }

    /// 整圆
    pub fn circle(center: Point3, radius: f64, normal: Vector3) -> Self {
        let (x_axis, _) = arbitrary_axes(&normal);
        Self::new(center, x_axis * radius, 1.0, 0.0, 360.0, normal)
    }

    /// 圆弧（角度为度，沿参数方向从 start 扫到 end）
    pub fn arc(
        center: Point3,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        normal: Vector3,
    ) -> Self {
        let (x_axis, _) = arbitrary_axes(&normal);
        Self::new(center, x_axis * radius, 1.0, start_angle, end_angle, normal)
    }

    /// 短半轴向量
    pub fn minor_axis(&self) -> Vector3 {
        let n = if self.normal.norm() < EPSILON {
            Vector3::z()
        } else {
            self.normal.normalize()
        };
        let major_len = self.major_axis.norm();
        if major_len < EPSILON {
            return Vector3::zeros();
        }
        n.cross(&self.major_axis).normalize() * (major_len * self.minor_ratio)
    }

    /// 是否为完整椭圆（扫掠角覆盖 360°）
    pub fn is_full(&self) -> bool {
        (self.end_angle - self.start_angle).abs() >= 360.0 - EPSILON
    }

    /// 扫掠角（度，恒为正）
    pub fn sweep(&self) -> f64 {
        let mut sweep = self.end_angle - self.start_angle;
        while sweep <= 0.0 {
            sweep += 360.0;
        }
        sweep.min(360.0)
    }

    /// 参数角（度）处的曲线点
    pub fn point_at_angle(&self, angle_deg: f64) -> Point3 {
        let rad = deg_to_rad(angle_deg);
        self.center + self.major_axis * rad.cos() + self.minor_axis() * rad.sin()
    }

    /// 参数角是否落在扫掠范围内
    pub fn contains_angle(&self, angle_deg: f64) -> bool {
        if self.is_full() {
            return true;
        }
        let start = normalize_angle(self.start_angle);
        let a = normalize_angle(angle_deg);
        let mut delta = a - start;
        if delta < 0.0 {
            delta += 360.0;
        }
        delta <= self.sweep() + EPSILON
    }

    /// 按固定角度步长采样为折线顶点
    pub fn sample_polyline(&self) -> Vec<Point3> {
        let sweep = self.sweep();
        let steps = (sweep / ARC_SAMPLE_STEP_DEG).ceil().max(1.0) as usize;
        let mut points = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let angle = self.start_angle + sweep * (i as f64 / steps as f64);
            points.push(self.point_at_angle(angle));
        }
        points
    }

    fn snap_points(&self) -> Vec<SnapPoint> {
        let mut points = vec![SnapPoint::new(self.center, SnapPointKind::Center)];

        // 焦点：短长轴比为 1（圆）时与中心重合，省略
        if self.minor_ratio < 1.0 - EPSILON {
            let a = self.major_axis.norm();
            if a > EPSILON {
                let c = a * (1.0 - self.minor_ratio * self.minor_ratio).sqrt();
                let dir = self.major_axis / a;
                points.push(SnapPoint::new(self.center + dir * c, SnapPointKind::Focus));
                points.push(SnapPoint::new(self.center - dir * c, SnapPointKind::Focus));
            }
        }

        for quadrant in [0.0, 90.0, 180.0, 270.0] {
            if self.contains_angle(quadrant) {
                points.push(SnapPoint::new(
                    self.point_at_angle(quadrant),
                    SnapPointKind::Quadrant,
                ));
            }
        }

        if !self.is_full() {
            points.push(SnapPoint::new(
                self.point_at_angle(self.start_angle),
                SnapPointKind::EndPoint,
            ));
            points.push(SnapPoint::new(
                self.point_at_angle(self.end_angle),
                SnapPointKind::EndPoint,
            ));
            points.push(SnapPoint::new(
                self.point_at_angle(self.start_angle + self.sweep() / 2.0),
                SnapPointKind::MidPoint,
            ));
        }

        points
    }
}

/// 点标记图元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitivePoint {
    pub location: Point3,
}

impl PrimitivePoint {
    pub fn new(location: Point3) -> Self {
        Self { location }
    }
}

/// 文本图元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveText {
    /// 插入点（文本基线左端）
    pub location: Point3,
    /// 文本内容
    pub value: String,
    /// 文本高度
    pub height: f64,
    /// 平面内旋转角（度）
    pub rotation: f64,
    /// 所在平面法向
    pub normal: Vector3,
}

impl PrimitiveText {
    pub fn new(
        location: Point3,
        value: impl Into<String>,
        height: f64,
        rotation: f64,
        normal: Vector3,
    ) -> Self {
        Self {
            location,
            value: value.into(),
            height,
            rotation,
            normal,
        }
    }

    /// 估算文本宽度（中文字符按高度计，英文按高度的 0.6 倍计）
    pub fn estimated_width(&self) -> f64 {
        let char_count = self.value.chars().count();
        let cjk_count = self.value.chars().filter(|c| is_cjk(*c)).count();
        let ascii_count = char_count - cjk_count;
        (cjk_count as f64 * self.height) + (ascii_count as f64 * self.height * 0.6)
    }

    /// 文本包围四角（世界坐标，逆时针）
    pub fn corners(&self) -> [Point3; 4] {
        quad_corners(
            self.location,
            self.estimated_width(),
            self.height,
            self.rotation,
            &self.normal,
        )
    }
}

/// 三次贝塞尔图元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveBezier {
    pub p1: Point3,
    pub p2: Point3,
    pub p3: Point3,
    pub p4: Point3,
}

impl PrimitiveBezier {
    pub fn new(p1: Point3, p2: Point3, p3: Point3, p4: Point3) -> Self {
        Self { p1, p2, p3, p4 }
    }

    /// 参数 t ∈ [0, 1] 处的曲线点
    pub fn point_at(&self, t: f64) -> Point3 {
        let u = 1.0 - t;
        let c = self.p1.coords * (u * u * u)
            + self.p2.coords * (3.0 * u * u * t)
            + self.p3.coords * (3.0 * u * t * t)
            + self.p4.coords * (t * t * t);
        Point3::from(c)
    }

    /// 按固定分段数采样为折线顶点
    pub fn sample_polyline(&self) -> Vec<Point3> {
        (0..=BEZIER_SAMPLE_SEGMENTS)
            .map(|i| self.point_at(i as f64 / BEZIER_SAMPLE_SEGMENTS as f64))
            .collect()
    }

    fn snap_points(&self) -> Vec<SnapPoint> {
        vec![
            SnapPoint::new(self.p1, SnapPointKind::EndPoint),
            SnapPoint::new(self.p4, SnapPointKind::EndPoint),
            SnapPoint::new(self.point_at(0.5), SnapPointKind::MidPoint),
        ]
    }
}

/// 图像图元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveImage {
    /// 插入点（左下角）
    pub location: Point3,
    /// 图像路径
    pub path: String,
    /// 世界宽度
    pub width: f64,
    /// 世界高度
    pub height: f64,
    /// 平面内旋转角（度）
    pub rotation: f64,
}

impl PrimitiveImage {
    pub fn new(
        location: Point3,
        path: impl Into<String>,
        width: f64,
        height: f64,
        rotation: f64,
    ) -> Self {
        Self {
            location,
            path: path.into(),
            width,
            height,
            rotation,
        }
    }

    /// 图像包围四角（世界坐标，逆时针）
    pub fn corners(&self) -> [Point3; 4] {
        quad_corners(
            self.location,
            self.width,
            self.height,
            self.rotation,
            &Vector3::z(),
        )
    }
}

/// 以插入点为左下角，在法向平面内旋转后的矩形四角
fn quad_corners(location: Point3, width: f64, height: f64, rotation: f64, normal: &Vector3) -> [Point3; 4] {
    let (x_axis, y_axis) = arbitrary_axes(normal);
    let rad = deg_to_rad(rotation);
    let right = x_axis * rad.cos() + y_axis * rad.sin();
    let up = y_axis * rad.cos() - x_axis * rad.sin();
    [
        location,
        location + right * width,
        location + right * width + up * height,
        location + up * height,
    ]
}

/// 判断字符是否为 CJK 字符
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'     // CJK统一汉字
        | '\u{3400}'..='\u{4DBF}'   // CJK扩展A
        | '\u{F900}'..='\u{FAFF}'   // CJK兼容汉字
        | '\u{3000}'..='\u{303F}'   // CJK标点
        | '\u{FF00}'..='\u{FFEF}'   // 全角字符
    )
}

// ========== 测试 ==========

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_snap_points() {
        let line = PrimitiveLine::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
        let snaps = line.snap_points();
        assert_eq!(snaps.len(), 3);
        assert!(snaps
            .iter()
            .any(|s| s.kind == SnapPointKind::MidPoint
                && (s.point - Point3::new(5.0, 0.0, 0.0)).norm() < EPSILON));
    }

    #[test]
    fn test_circle_snap_points() {
        let circle = PrimitiveEllipse::circle(Point3::new(1.0, 2.0, 0.0), 5.0, Vector3::z());
        let snaps = circle.snap_points();
        // 圆心 + 4 个象限点，无焦点（比值为 1）、无端点（整圆）
        assert_eq!(snaps.len(), 5);
        assert_eq!(
            snaps.iter().filter(|s| s.kind == SnapPointKind::Quadrant).count(),
            4
        );
        assert!(!snaps.iter().any(|s| s.kind == SnapPointKind::Focus));
    }

    #[test]
    fn test_ellipse_foci() {
        // a=5, b=3 → c=4
        let e = PrimitiveEllipse::new(
            Point3::origin(),
            Vector3::new(5.0, 0.0, 0.0),
            0.6,
            0.0,
            360.0,
            Vector3::z(),
        );
        let foci: Vec<_> = e
            .snap_points()
            .into_iter()
            .filter(|s| s.kind == SnapPointKind::Focus)
            .collect();
        assert_eq!(foci.len(), 2);
        assert!(foci
            .iter()
            .any(|s| (s.point - Point3::new(4.0, 0.0, 0.0)).norm() < 1e-9));
        assert!(foci
            .iter()
            .any(|s| (s.point - Point3::new(-4.0, 0.0, 0.0)).norm() < 1e-9));
    }

    #[test]
    fn test_arc_contains_angle() {
        // 跨 0° 的圆弧：350° → 20°
        let arc = PrimitiveEllipse::arc(Point3::origin(), 1.0, 350.0, 380.0, Vector3::z());
        assert!(arc.contains_angle(355.0));
        assert!(arc.contains_angle(10.0));
        assert!(!arc.contains_angle(90.0));
        // 端点与中点捕捉
        let snaps = arc.snap_points();
        assert_eq!(
            snaps.iter().filter(|s| s.kind == SnapPointKind::EndPoint).count(),
            2
        );
        assert_eq!(
            snaps.iter().filter(|s| s.kind == SnapPointKind::MidPoint).count(),
            1
        );
    }

    #[test]
    fn test_circle_sample_polyline() {
        let circle = PrimitiveEllipse::circle(Point3::origin(), 2.0, Vector3::z());
        let pts = circle.sample_polyline();
        // 1° 步长整圆：361 个顶点，首尾重合
        assert_eq!(pts.len(), 361);
        assert!((pts[0] - pts[360]).norm() < 1e-9);
        for p in &pts {
            assert!(((p - Point3::origin()).norm() - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bezier_point_at() {
        let b = PrimitiveBezier::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        );
        assert!((b.point_at(0.0) - b.p1).norm() < EPSILON);
        assert!((b.point_at(1.0) - b.p4).norm() < EPSILON);
        // 对称曲线中点在 x=0.5
        let mid = b.point_at(0.5);
        assert!((mid.x - 0.5).abs() < 1e-9);
        assert_eq!(b.sample_polyline().len(), BEZIER_SAMPLE_SEGMENTS + 1);
    }

    #[test]
    fn test_text_corners() {
        let t = PrimitiveText::new(Point3::origin(), "ab", 10.0, 0.0, Vector3::z());
        let corners = t.corners();
        // 两个 ASCII 字符：宽 = 2 * 10 * 0.6 = 12
        assert!((corners[1] - Point3::new(12.0, 0.0, 0.0)).norm() < 1e-9);
        assert!((corners[3] - Point3::new(0.0, 10.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_text_estimated_width_cjk() {
        let t = PrimitiveText::new(Point3::origin(), "图a", 10.0, 0.0, Vector3::z());
        // 一个中文字符 + 一个 ASCII：10 + 6
        assert!((t.estimated_width() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_image_corners_rotated() {
        let img = PrimitiveImage::new(Point3::origin(), "a.png", 4.0, 2.0, 90.0);
        let corners = img.corners();
        assert!((corners[1] - Point3::new(0.0, 4.0, 0.0)).norm() < 1e-9);
        assert!((corners[3] - Point3::new(-2.0, 0.0, 0.0)).norm() < 1e-9);
    }
}

//! DCAD 核心几何与文档模型
//!
//! 提供交互引擎所依赖的基础层：
//! - `math`: nalgebra 类型别名、屏幕矩形与绘图平面
//! - `geometry`: 渲染/拾取图元与捕捉点
//! - `entity`: 实体及其图元分解
//! - `drawing`: 图层化的图形文档
//! - `input_parser`: 命令行坐标/距离语法
//! - `settings`: 工作区交互参数
//!
//! # 示例
//!
//! ```rust
//! use dcad_core::prelude::*;
//!
//! let mut drawing = Drawing::new();
//! let id = drawing.add_entity(Entity::line(
//!     Point3::origin(),
//!     Point3::new(100.0, 50.0, 0.0),
//! ));
//! assert!(drawing.contains_entity(id));
//! ```

pub mod drawing;
pub mod entity;
pub mod geometry;
pub mod input_parser;
pub mod math;
pub mod settings;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::drawing::{Drawing, Layer, Units, DEFAULT_LAYER};
    pub use crate::entity::{Entity, EntityId, EntityKind};
    pub use crate::geometry::{
        Primitive, PrimitiveBezier, PrimitiveEllipse, PrimitiveImage, PrimitiveLine,
        PrimitivePoint, PrimitiveText, SnapPoint, SnapPointKind,
    };
    pub use crate::input_parser::{InputParser, InputValue, ParseError};
    pub use crate::math::{
        DrawingPlane, Matrix4, Point2, Point3, ScreenRect, Vector2, Vector3, EPSILON,
    };
    pub use crate::settings::WorkspaceSettings;
}

//! DCAD 交互引擎
//!
//! 把宿主 UI 的原始指针/键盘事件变成文档操作：
//! - `input`: 输入协调器，命令协程挂起等待类型化输入
//! - `display`: 视口变换与活动点解析（捕捉/正交/角度）
//! - `snap_index`: 屏幕空间捕捉点四叉树，后台可取消重建
//! - `hit_test`: 屏幕空间实体拾取
//! - `selection`: 窗选/叉选矩形语义
//! - `command`: 命令注册表与串行执行门
//! - `workspace`: 装配入口
//!
//! 宿主只需要转发事件并订阅 [`events::WorkspaceEvent`]：
//!
//! ```rust,no_run
//! use dcad_interact::prelude::*;
//!
//! # async fn demo() -> Result<(), TransformError> {
//! let ws = Workspace::new()?;
//! ws.resize(1280.0, 720.0)?;
//! let _events = ws.events("ui");
//! ws.submit_input("LINE");
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod commands;
pub mod display;
pub mod events;
pub mod hit_test;
pub mod input;
pub mod selection;
pub mod snap_index;
pub mod viewport;
pub mod workspace;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::command::{CommandGate, CommandKind, CommandRegistry};
    pub use crate::display::{CursorStateSet, InteractionEngine, MouseButton};
    pub use crate::events::{EventHub, WorkspaceEvent};
    pub use crate::input::{
        InputBroker, InputKind, InputKindSet, InputRequestResult, UserDirective,
    };
    pub use crate::selection::{SelectionMode, SelectionRectangle, SelectionState};
    pub use crate::snap_index::{SnapPointIndex, TransformedSnapPoint};
    pub use crate::viewport::{TransformError, ViewPort, ViewportSnapshot};
    pub use crate::workspace::Workspace;
}

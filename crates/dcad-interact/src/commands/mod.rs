//! 内置命令
//!
//! 每个命令是一个 async 函数，通过输入协调器依次请求所需
//! 输入，挂起等待显示层或命令行喂入的值，返回是否提交了结果。

pub(crate) mod draw_circle;
pub(crate) mod draw_line;
pub(crate) mod draw_point;
pub(crate) mod erase;
pub(crate) mod zoom_window;

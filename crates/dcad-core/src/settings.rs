//! 工作区设置
//!
//! 捕捉、正交、选择等交互参数。距离类参数均以屏幕像素为单位，
//! 与缩放级别无关。

use serde::{Deserialize, Serialize};

/// 工作区设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// 对象捕捉开关
    pub point_snap: bool,
    /// 正交模式开关
    pub ortho: bool,
    /// 角度捕捉开关
    pub angle_snap: bool,
    /// 对象捕捉距离（像素）
    pub snap_point_distance: f64,
    /// 角度捕捉距离（像素）
    pub snap_angle_distance: f64,
    /// 角度捕捉的候选角（度）
    pub snap_angles: Vec<f64>,
    /// 实体拾取半径（像素）
    pub entity_selection_radius: f64,
    /// 滚轮缩放比例（每格）
    pub zoom_scale: f64,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            point_snap: true,
            ortho: false,
            angle_snap: false,
            snap_point_distance: 15.0,
            snap_angle_distance: 30.0,
            snap_angles: vec![0.0, 90.0, 180.0, 270.0],
            entity_selection_radius: 10.0,
            zoom_scale: 1.25,
        }
    }
}

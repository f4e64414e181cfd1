//! 窗口缩放命令
//!
//! 请求一个选择矩形，把视口对齐到矩形覆盖的世界范围。

use crate::events::WorkspaceEvent;
use crate::workspace::Workspace;
use std::sync::Arc;

pub(crate) async fn run(workspace: &Arc<Workspace>) -> bool {
    workspace.hub().publish(WorkspaceEvent::OutputMessage {
        text: "指定窗口角点:".to_string(),
    });

    let engine = workspace.engine();
    let Some(rect) = engine.get_selection_rectangle().await else {
        return false;
    };

    engine.zoom_to_world_rect(rect.world_corner1, rect.world_corner2)
}

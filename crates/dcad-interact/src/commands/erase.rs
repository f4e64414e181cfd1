//! 删除命令
//!
//! 优先删除已有的持久选择集；为空时进入对象收集，
//! 回车/右键确认后批量删除。

use crate::events::WorkspaceEvent;
use crate::input::{InputRequestResult, UserDirective};
use crate::workspace::Workspace;
use std::sync::Arc;

pub(crate) async fn run(workspace: &Arc<Workspace>) -> bool {
    let engine = workspace.engine();
    let preselected = engine.selected_entities();

    let targets = if preselected.is_empty() {
        match workspace
            .broker()
            .get_entities(UserDirective::new("选择对象:"))
            .await
        {
            InputRequestResult::Value(entities) => entities,
            _ => return false,
        }
    } else {
        engine.clear_selection();
        preselected
    };

    if targets.is_empty() {
        workspace.hub().publish(WorkspaceEvent::OutputMessage {
            text: "未选择任何对象".to_string(),
        });
        return false;
    }

    let count = targets.len();
    workspace.update_drawing(|drawing| {
        for entity in &targets {
            drawing.remove_entity(entity.id);
        }
    });
    workspace.hub().publish(WorkspaceEvent::OutputMessage {
        text: format!("已删除 {} 个对象", count),
    });
    true
}

//! 点命令

use crate::input::{InputRequestResult, UserDirective};
use crate::workspace::Workspace;
use dcad_core::entity::Entity;
use std::sync::Arc;

pub(crate) async fn run(workspace: &Arc<Workspace>) -> bool {
    match workspace
        .broker()
        .get_point(UserDirective::new("指定点:"), None)
        .await
    {
        InputRequestResult::Value(p) => {
            workspace.update_drawing(|drawing| {
                drawing.add_entity(Entity::location(p));
            });
            true
        }
        _ => false,
    }
}

//! 圆命令
//!
//! 圆心加半径两步绘制，半径阶段橡皮筋预览随光标变化的圆。

use crate::input::{InputRequestResult, RubberBandGenerator, UserDirective};
use crate::workspace::Workspace;
use dcad_core::entity::Entity;
use dcad_core::geometry::{Primitive, PrimitiveEllipse};
use dcad_core::math::Vector3;
use std::sync::Arc;

pub(crate) async fn run(workspace: &Arc<Workspace>) -> bool {
    let broker = workspace.broker();

    let center = match broker
        .get_point(UserDirective::new("指定圆心:"), None)
        .await
    {
        InputRequestResult::Value(p) => p,
        _ => return false,
    };

    let preview: Arc<RubberBandGenerator> = Arc::new(move |cursor| {
        let radius = (*cursor - center).norm();
        if radius < 1e-6 {
            return Vec::new();
        }
        vec![Primitive::Ellipse(PrimitiveEllipse::circle(
            center,
            radius,
            Vector3::z(),
        ))]
    });

    match broker
        .get_distance(UserDirective::new("指定半径:"), Some(preview))
        .await
    {
        InputRequestResult::Value(radius) if radius > 1e-6 => {
            workspace.update_drawing(|drawing| {
                drawing.add_entity(Entity::circle(center, radius));
            });
            true
        }
        _ => false,
    }
}

//! 直线命令
//!
//! 依次拾取顶点绘制连续线段，每段落点后立即入图。
//! 画出至少一段后可输入 C 闭合回第一点。

use crate::input::{InputRequestResult, RubberBandGenerator, UserDirective};
use crate::workspace::Workspace;
use dcad_core::entity::Entity;
use dcad_core::geometry::{Primitive, PrimitiveLine};
use std::sync::Arc;

pub(crate) async fn run(workspace: &Arc<Workspace>) -> bool {
    let broker = workspace.broker();

    let first = match broker
        .get_point(UserDirective::new("指定第一点:"), None)
        .await
    {
        InputRequestResult::Value(p) => p,
        _ => return false,
    };

    let mut start = first;
    let mut segments = 0usize;
    let mut committed = false;

    loop {
        let directive = if segments >= 1 {
            UserDirective::with_tokens("指定下一点 或 [闭合(C)]:", &["c"])
        } else {
            UserDirective::new("指定下一点:")
        };
        let from = start;
        let preview: Arc<RubberBandGenerator> =
            Arc::new(move |cursor| vec![Primitive::Line(PrimitiveLine::new(from, *cursor))]);

        match broker.get_point(directive, Some(preview)).await {
            InputRequestResult::Value(next) => {
                // 拒绝零长度线段
                if (next - start).norm() < 1e-6 {
                    continue;
                }
                workspace.update_drawing(|drawing| {
                    drawing.add_entity(Entity::line(start, next));
                });
                segments += 1;
                committed = true;
                start = next;
            }
            InputRequestResult::Directive(token) if token == "c" => {
                // 闭合回第一点，与当前点重合时不补段
                if (first - start).norm() > 1e-6 {
                    workspace.update_drawing(|drawing| {
                        drawing.add_entity(Entity::line(start, first));
                    });
                    committed = true;
                }
                break;
            }
            _ => break,
        }
    }

    committed
}

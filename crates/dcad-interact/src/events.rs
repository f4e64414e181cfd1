//! 工作区事件总线
//!
//! 交互引擎产生的所有对外通知都经由事件总线广播：
//! 宿主 UI 订阅后据此绘制光标、捕捉指示、橡皮筋与选择框。
//! 发布是同步非阻塞的，订阅者通过无界通道异步消费。

use crate::display::CursorStateSet;
use crate::input::InputKindSet;
use crate::selection::SelectionState;
use crate::snap_index::TransformedSnapPoint;
use dcad_core::geometry::Primitive;
use dcad_core::math::Point3;
use futures::channel::mpsc;
use std::collections::HashMap;
use std::sync::Mutex;

/// 工作区事件
#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    /// 输入协调
    ValueRequested {
        allowed: InputKindSet,
    },
    ValueReceived,
    InputRejected {
        reason: String,
    },

    /// 指针与捕捉
    CursorWorldLocationUpdated {
        point: Point3,
    },
    CurrentSnapPointUpdated {
        snap: Option<TransformedSnapPoint>,
    },
    CursorStateUpdated {
        state: CursorStateSet,
    },

    /// 预览与选择
    RubberBandPrimitivesChanged {
        primitives: Vec<Primitive>,
    },
    SelectionRectangleUpdated {
        state: Option<SelectionState>,
    },
    HotPointsUpdated {
        points: Vec<Point3>,
    },

    /// 文档与视图
    DrawingChanged,
    ViewPortChanged,

    /// 命令执行
    CommandStarted {
        name: String,
    },
    CommandEnded {
        name: String,
        committed: bool,
    },
    OutputMessage {
        text: String,
    },
}

/// 事件总线
pub struct EventHub {
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<WorkspaceEvent>>>>,
}

impl EventHub {
    /// 创建新的事件总线
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// 订阅事件
    pub fn subscribe(
        &self,
        subscriber_id: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<WorkspaceEvent> {
        let (sender, receiver) = mpsc::unbounded();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers
            .entry(subscriber_id.into())
            .or_default()
            .push(sender);
        receiver
    }

    /// 取消订阅
    pub fn unsubscribe(&self, subscriber_id: &str) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.remove(subscriber_id);
    }

    /// 广播事件给所有订阅者
    ///
    /// 已关闭的订阅通道在广播时顺带清理。
    pub fn publish(&self, event: WorkspaceEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        for senders in subscribers.values_mut() {
            senders.retain(|s| s.unbounded_send(event.clone()).is_ok());
        }
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.values().map(|v| v.len()).sum()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 测试 ==========

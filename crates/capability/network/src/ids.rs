//! 节点 ID 分配
//!
//! 协议处理器与网络模型运行在不同任务中，二者共享一个 [`NodeIdTracker`]：
//! 处理器转发消息前先记入该节点，网络任务每处理完一条消息再写入
//! 最新的"下一个 ID"。两边都只取较大值，因此排队中的节点不会被重复分配。

use domain::FIRST_NODE_ID;
use mysgw_protocol::NodeIdSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

/// 表示 ID 已耗尽（超出 u8 范围）。
const EXHAUSTED: u16 = u8::MAX as u16 + 1;

/// 计算下一个节点 ID：比已知最大 ID 大 1，从不复用。
pub fn next_node_id(ids: impl IntoIterator<Item = u8>) -> Option<u8> {
    let mut next = Some(FIRST_NODE_ID);
    for id in ids {
        if let Some(candidate) = next
            && id >= candidate
        {
            next = id.checked_add(1);
        }
    }
    next
}

/// 共享的下一个节点 ID。
#[derive(Debug, Clone)]
pub struct NodeIdTracker {
    next: Arc<AtomicU16>,
}

impl Default for NodeIdTracker {
    fn default() -> Self {
        Self {
            next: Arc::new(AtomicU16::new(u16::from(FIRST_NODE_ID))),
        }
    }
}

impl NodeIdTracker {
    pub(crate) fn update(&self, next: Option<u8>) {
        self.next
            .fetch_max(next.map(u16::from).unwrap_or(EXHAUSTED), Ordering::AcqRel);
    }
}

impl NodeIdSource for NodeIdTracker {
    fn next_node_id(&self) -> Option<u8> {
        u8::try_from(self.next.load(Ordering::Acquire)).ok()
    }

    fn note_forwarded(&self, node_id: u8) {
        self.next.fetch_max(u16::from(node_id) + 1, Ordering::AcqRel);
    }
}

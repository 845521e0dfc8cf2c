//! 协议处理器
//!
//! | 类型 | 副作用 | 回复 |
//! |---|---|---|
//! | Presentation | 转发 | 无 |
//! | Set | 转发；强制就绪 | 无 |
//! | Req | 转发 | 无（由网络模型回复） |
//! | Internal/I_ID_REQUEST | | I_ID_RESPONSE，负载为下一个节点 ID |
//! | Internal/I_CONFIG | | I_CONFIG，负载 `M` |
//! | Internal/I_GATEWAY_READY | 就绪；转发 | 无 |
//! | Internal/I_TIME | | I_TIME，负载为 Unix 秒 |
//! | Internal/其他 | 转发；记录不支持 | 无 |

use crate::error::ProtocolError;
use crate::gate::{GatedSender, ReadyTrigger, ReplyOrigin};
use domain::{InternalType, Message, MessageType, SubType};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 公制单位（`I_CONFIG` 回复）。
pub const METRIC_CONFIG: &str = "M";

/// 下一个可分配的节点 ID（由网络模型提供）。
pub trait NodeIdSource: Send + Sync {
    /// ID 耗尽时返回 `None`。
    fn next_node_id(&self) -> Option<u8>;

    /// 处理器即将把该节点的消息转发给网络模型。
    ///
    /// 网络任务可能尚未处理排队中的消息，来源须立即把该节点计入已知节点。
    fn note_forwarded(&self, _node_id: u8) {}
}

/// 单条消息的处理结果。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Disposition {
    pub reply: Option<Message>,
    pub forward: bool,
}

impl Disposition {
    fn forward() -> Self {
        Self {
            reply: None,
            forward: true,
        }
    }

    fn reply(reply: Message) -> Self {
        Self {
            reply: Some(reply),
            forward: false,
        }
    }
}

pub struct ProtocolHandler {
    ids: Arc<dyn NodeIdSource>,
    replies: GatedSender,
}

impl ProtocolHandler {
    pub fn new(ids: Arc<dyn NodeIdSource>, replies: GatedSender) -> Self {
        Self { ids, replies }
    }

    /// 计算处理结果并执行就绪切换。
    pub fn process(&self, message: &Message) -> Disposition {
        match message.message_type {
            MessageType::Presentation | MessageType::Req => Disposition::forward(),
            MessageType::Set => {
                self.replies.gate().mark_ready(ReadyTrigger::SetObserved);
                Disposition::forward()
            }
            MessageType::Internal => self.process_internal(message),
            MessageType::Stream | MessageType::Unknown(_) => {
                debug!(target: "mysgw.handler", message = %message, "message_type_ignored");
                Disposition::default()
            }
        }
    }

    fn process_internal(&self, message: &Message) -> Disposition {
        let SubType::Internal(internal) = message.sub_type else {
            return Disposition::forward();
        };
        match internal {
            InternalType::IdRequest => match self.ids.next_node_id() {
                Some(id) => Disposition::reply(message.reply(
                    SubType::Internal(InternalType::IdResponse),
                    id.to_string(),
                )),
                None => {
                    warn!(target: "mysgw.handler", message = %message, "node_ids_exhausted");
                    Disposition::default()
                }
            },
            InternalType::Config => Disposition::reply(
                message.reply(SubType::Internal(InternalType::Config), METRIC_CONFIG),
            ),
            InternalType::Time => Disposition::reply(message.reply(
                SubType::Internal(InternalType::Time),
                unix_seconds().to_string(),
            )),
            InternalType::GatewayReady => {
                self.replies.gate().mark_ready(ReadyTrigger::GatewayReady);
                Disposition::forward()
            }
            _ => {
                info!(
                    target: "mysgw.handler",
                    message = %message,
                    "internal_unsupported_passthrough"
                );
                Disposition::forward()
            }
        }
    }

    /// 处理循环：回复经门控发往链路，需要建模的消息转发给网络模型。
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<Message>,
        network_tx: mpsc::Sender<Message>,
    ) -> Result<(), ProtocolError> {
        while let Some(message) = rx.recv().await {
            let disposition = self.process(&message);
            if let Some(reply) = disposition.reply {
                self.replies.send(reply, ReplyOrigin::Handler).await?;
            }
            if disposition.forward {
                self.ids.note_forwarded(message.node_id);
                network_tx
                    .send(message)
                    .await
                    .map_err(|_| ProtocolError::ChannelClosed)?;
            }
        }
        info!(target: "mysgw.handler", "handler_stopped");
        Ok(())
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use crate::gate::ReadinessGate;
    use mysgw_telemetry::LinkMetrics;

    struct FixedId(Option<u8>);

    impl NodeIdSource for FixedId {
        fn next_node_id(&self) -> Option<u8> {
            self.0
        }
    }

    fn handler(next: Option<u8>) -> ProtocolHandler {
        let (tx, _rx) = mpsc::channel(1);
        let metrics = LinkMetrics::detached().expect("metrics");
        ProtocolHandler::new(
            Arc::new(FixedId(next)),
            GatedSender::new(tx, ReadinessGate::new(), metrics),
        )
    }

    #[test]
    fn config_reply_is_metric() {
        let disposition = handler(Some(1)).process(&decode(b"5;255;3;0;6;0\n").expect("decode"));
        let reply = disposition.reply.expect("reply");
        assert_eq!(reply.payload, b"M".to_vec());
        assert_eq!(reply.node_id, 5);
        assert!(!disposition.forward);
    }

    #[test]
    fn time_reply_is_unix_seconds() {
        let disposition = handler(Some(1)).process(&decode(b"5;255;3;0;1;\n").expect("decode"));
        let reply = disposition.reply.expect("reply");
        let seconds: u64 = reply.payload_str().parse().expect("numeric");
        assert!(seconds > 1_500_000_000);
    }

    #[test]
    fn exhausted_ids_produce_no_reply() {
        let disposition = handler(None).process(&decode(b"0;255;3;0;3;\n").expect("decode"));
        assert_eq!(disposition, Disposition::default());
    }

    #[test]
    fn other_internal_is_forwarded() {
        let disposition = handler(None).process(&decode(b"3;255;3;0;11;Sketch\n").expect("decode"));
        assert!(disposition.forward);
        assert!(disposition.reply.is_none());
    }

    #[test]
    fn stream_is_dropped() {
        let disposition = handler(None).process(&decode(b"3;1;4;0;0;ff\n").expect("decode"));
        assert_eq!(disposition, Disposition::default());
    }
}

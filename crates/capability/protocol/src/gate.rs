//! 握手门控
//!
//! 链路状态只有两个：`NotReady`（初始）与 `Ready`（终态）。
//! 两个回复生产者（协议处理器与网络模型）共用一个发送通道，
//! 门控检查集中在 [`GatedSender`]，未就绪时计算出的回复直接丢弃。

use crate::error::ProtocolError;
use domain::Message;
use mysgw_telemetry::LinkMetrics;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// 链路状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    NotReady,
    Ready,
}

/// 进入 `Ready` 的触发条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyTrigger {
    /// 网关发送 `I_GATEWAY_READY`
    GatewayReady,
    /// 观察到任意 Set 消息（网关早于本进程启动时不会再发就绪通知）
    SetObserved,
}

impl fmt::Display for ReadyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GatewayReady => f.write_str("gateway_ready"),
            Self::SetObserved => f.write_str("set_observed"),
        }
    }
}

/// 回复来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOrigin {
    Handler,
    Network,
}

impl ReplyOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handler => "handler",
            Self::Network => "network",
        }
    }
}

/// 共享的就绪标志。
#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        if self.is_ready() {
            LinkState::Ready
        } else {
            LinkState::NotReady
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// 切换到 `Ready`；仅首次切换返回 `true`。
    pub fn mark_ready(&self, trigger: ReadyTrigger) -> bool {
        let transitioned = !self.ready.swap(true, Ordering::AcqRel);
        if transitioned {
            info!(target: "mysgw.handler", trigger = %trigger, "link_ready");
        }
        transitioned
    }
}

/// 带门控的回复发送端。
#[derive(Clone)]
pub struct GatedSender {
    tx: mpsc::Sender<Message>,
    gate: ReadinessGate,
    metrics: LinkMetrics,
}

impl GatedSender {
    pub fn new(tx: mpsc::Sender<Message>, gate: ReadinessGate, metrics: LinkMetrics) -> Self {
        Self { tx, gate, metrics }
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    /// 发送回复；未就绪时丢弃并返回 `Ok(false)`。
    pub async fn send(&self, reply: Message, origin: ReplyOrigin) -> Result<bool, ProtocolError> {
        if !self.gate.is_ready() {
            self.metrics.record_reply_suppressed(origin.as_str());
            info!(
                target: "mysgw.handler",
                origin = origin.as_str(),
                reply = %reply,
                "reply_suppressed_not_ready"
            );
            return Ok(false);
        }
        debug!(target: "mysgw.handler", origin = origin.as_str(), reply = %reply, "reply_queued");
        self.tx
            .send(reply)
            .await
            .map_err(|_| ProtocolError::ChannelClosed)?;
        Ok(true)
    }
}

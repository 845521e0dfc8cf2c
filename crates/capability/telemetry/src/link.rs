//! 链路计数器：串口收发、解码失败、回复抑制与消息总线丢弃。

use crate::TelemetryError;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// 链路各任务共享的计数器（克隆代价低，内部为 `Arc`）。
#[derive(Clone)]
pub struct LinkMetrics {
    rx_messages: IntCounter,
    decode_errors: IntCounter,
    tx_messages: IntCounter,
    replies_suppressed: IntCounterVec,
    bus_dropped: IntCounter,
}

impl LinkMetrics {
    /// 创建并注册到指定注册表。
    pub fn register(registry: &Registry) -> Result<Self, TelemetryError> {
        let rx_messages = IntCounter::new(
            "mysgw_rx_messages_total",
            "Frames decoded from the gateway link",
        )?;
        let decode_errors = IntCounter::new(
            "mysgw_decode_errors_total",
            "Lines from the gateway link that failed to decode",
        )?;
        let tx_messages = IntCounter::new(
            "mysgw_tx_messages_total",
            "Frames written to the gateway link",
        )?;
        let replies_suppressed = IntCounterVec::new(
            Opts::new(
                "mysgw_replies_suppressed_total",
                "Replies dropped because the link was not ready",
            ),
            &["origin"],
        )?;
        let bus_dropped = IntCounter::new(
            "mysgw_bus_dropped_total",
            "Messages dropped because the bus queue was full",
        )?;

        registry.register(Box::new(rx_messages.clone()))?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(tx_messages.clone()))?;
        registry.register(Box::new(replies_suppressed.clone()))?;
        registry.register(Box::new(bus_dropped.clone()))?;

        Ok(Self {
            rx_messages,
            decode_errors,
            tx_messages,
            replies_suppressed,
            bus_dropped,
        })
    }

    /// 使用独立注册表创建（不导出）。
    pub fn detached() -> Result<Self, TelemetryError> {
        Self::register(&Registry::new())
    }

    pub fn record_rx_message(&self) {
        self.rx_messages.inc();
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.inc();
    }

    pub fn record_tx_message(&self) {
        self.tx_messages.inc();
    }

    pub fn record_reply_suppressed(&self, origin: &str) {
        self.replies_suppressed.with_label_values(&[origin]).inc();
    }

    pub fn record_bus_dropped(&self) {
        self.bus_dropped.inc();
    }

    pub fn rx_messages(&self) -> u64 {
        self.rx_messages.get()
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.get()
    }

    pub fn tx_messages(&self) -> u64 {
        self.tx_messages.get()
    }

    pub fn replies_suppressed(&self, origin: &str) -> u64 {
        self.replies_suppressed
            .get_metric_with_label_values(&[origin])
            .map(|metric| metric.get())
            .unwrap_or(0)
    }

    pub fn bus_dropped(&self) -> u64 {
        self.bus_dropped.get()
    }
}

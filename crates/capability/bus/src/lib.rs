//! # 消息总线转发
//!
//! 每条被网络模型成功处理的消息都会原样发布到总线：
//!
//! ```text
//! {prefix}/{node-id}/{child-sensor-id}/{type}/{ack}/{sub-type}   payload
//! ```
//!
//! 网络任务通过 [`BusForwarder`] 投递，队列满时丢弃最新消息，网络任务从不等待总线。

use async_trait::async_trait;
use domain::Message;
use mysgw_telemetry::LinkMetrics;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 总线错误。
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("publish error: {0}")]
    Publish(String),
    #[error("config error: {0}")]
    Config(String),
}

/// 消息发布器抽象。
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: &Message) -> Result<(), BusError>;
}

/// 空发布器（未配置总线时使用）。
#[derive(Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl MessagePublisher for NoopPublisher {
    async fn publish(&self, _message: &Message) -> Result<(), BusError> {
        Ok(())
    }
}

/// 消息对应的主题。
pub fn topic_for(prefix: &str, message: &Message) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}",
        prefix.trim_end_matches('/'),
        message.node_id,
        message.child_sensor_id,
        message.message_type.as_u8(),
        message.ack.as_u8(),
        message.sub_type.as_u8()
    )
}

/// MQTT 发布器配置。
#[derive(Debug, Clone)]
pub struct MqttPublisherConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub client_prefix: String,
}

/// MQTT 发布器（QoS 0，retain）。
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    topic_prefix: String,
}

impl MqttPublisher {
    /// 创建客户端并在独立任务中驱动事件循环（断线后由 rumqttc 重连）。
    pub fn connect(config: MqttPublisherConfig) -> Result<(Self, JoinHandle<()>), BusError> {
        if config.host.trim().is_empty() {
            return Err(BusError::Config("mqtt host is empty".to_string()));
        }
        let client_id = format!("{}{}", config.client_prefix, uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    warn!(target: "mysgw.bus", error = %err, "mqtt_eventloop_error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });
        Ok((
            Self {
                client,
                topic_prefix: config.topic_prefix,
            },
            handle,
        ))
    }
}

#[async_trait]
impl MessagePublisher for MqttPublisher {
    async fn publish(&self, message: &Message) -> Result<(), BusError> {
        let topic = topic_for(&self.topic_prefix, message);
        debug!(
            target: "mysgw.bus",
            topic = %topic,
            payload_size = message.payload.len(),
            "bus_publish"
        );
        self.client
            .publish(topic, QoS::AtMostOnce, true, message.payload.clone())
            .await
            .map_err(|err| BusError::Publish(err.to_string()))
    }
}

/// 有界转发队列，由单个任务按顺序发布。
#[derive(Clone)]
pub struct BusForwarder {
    tx: mpsc::Sender<Message>,
    metrics: LinkMetrics,
}

impl BusForwarder {
    pub fn spawn(
        publisher: Arc<dyn MessagePublisher>,
        capacity: usize,
        metrics: LinkMetrics,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Message>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(err) = publisher.publish(&message).await {
                    warn!(target: "mysgw.bus", message = %message, error = %err, "bus_publish_failed");
                }
            }
            info!(target: "mysgw.bus", "bus_forwarder_stopped");
        });
        (Self { tx, metrics }, handle)
    }

    /// 非阻塞投递；队列满或已关闭时丢弃并返回 `false`。
    pub fn forward(&self, message: Message) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                self.metrics.record_bus_dropped();
                warn!(target: "mysgw.bus", message = %message, "bus_queue_full_dropped");
                false
            }
            Err(TrySendError::Closed(message)) => {
                warn!(target: "mysgw.bus", message = %message, "bus_queue_closed_dropped");
                false
            }
        }
    }
}

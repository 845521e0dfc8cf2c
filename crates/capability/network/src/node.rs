use crate::error::NetworkError;
use crate::sensor::Sensor;
use domain::{InternalType, Message, MessageType, SetReqType, SubType};
use mysgw_telemetry::MetricsPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// 节点级消息（电量）使用的传感器标签。
const NODE_SENSOR_LABEL: &str = "0";

/// 传感器节点
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Node {
    pub id: u8,
    /// 电量百分比 0-100
    #[serde(default)]
    pub battery: u8,
    /// 运维标签，未配置时为空
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub sketch_name: String,
    #[serde(default)]
    pub sketch_version: String,
    /// 以十进制子传感器 ID 为键
    #[serde(default)]
    pub sensors: HashMap<String, Sensor>,
}

impl Node {
    pub fn new(id: u8, location: String) -> Self {
        Self {
            id,
            location,
            ..Self::default()
        }
    }

    pub fn sensor(&self, child_sensor_id: u8) -> Option<&Sensor> {
        self.sensors.get(&child_sensor_id.to_string())
    }

    pub(crate) fn reattach(&mut self) {
        for sensor in self.sensors.values_mut() {
            sensor.attach(self.id);
        }
    }

    pub(crate) fn handle_message(
        &mut self,
        message: &Message,
        metrics: &mut MetricsPolicy,
    ) -> Result<Option<Message>, NetworkError> {
        self.id = message.node_id;
        metrics.record_packet(&self.id.to_string(), &self.location);

        if message.is_node_level() {
            return self.handle_node_message(message, metrics).map(|()| None);
        }

        let sensor = self
            .sensors
            .entry(message.child_sensor_id.to_string())
            .or_insert_with(|| Sensor::new(message.child_sensor_id, message.node_id));
        sensor.handle_message(message, &self.location, metrics)
    }

    fn handle_node_message(
        &mut self,
        message: &Message,
        metrics: &mut MetricsPolicy,
    ) -> Result<(), NetworkError> {
        if message.message_type != MessageType::Internal {
            return Err(NetworkError::NodeLevelNotInternal {
                node_id: self.id,
                message_type: message.message_type.to_string(),
            });
        }
        let payload = message.payload_str();
        match message.sub_type {
            SubType::Internal(InternalType::BatteryLevel) => {
                let battery = payload
                    .parse::<u8>()
                    .ok()
                    .filter(|level| *level <= 100)
                    .ok_or_else(|| NetworkError::InvalidBattery {
                        payload: payload.to_string(),
                    })?;
                self.battery = battery;
                let node = self.id.to_string();
                metrics.observe(
                    SetReqType::Percentage,
                    [self.location.as_str(), node.as_str(), NODE_SENSOR_LABEL],
                    f64::from(battery) / 100.0,
                )?;
                info!(target: "mysgw.network", node_id = self.id, battery, "battery_level");
            }
            SubType::Internal(InternalType::Version) => self.version = payload.into_owned(),
            SubType::Internal(InternalType::SketchName) => self.sketch_name = payload.into_owned(),
            SubType::Internal(InternalType::SketchVersion) => {
                self.sketch_version = payload.into_owned()
            }
            _ => debug!(target: "mysgw.network", message = %message, "node_message_unhandled"),
        }
        Ok(())
    }
}

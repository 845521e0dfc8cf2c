use crate::error::NetworkError;
use crate::variable::Variable;
use domain::{Message, MessageType, PresentationType, SubType};
use mysgw_telemetry::MetricsPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// 子传感器；变量与所属节点的回指不进入快照。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sensor {
    pub id: u8,
    #[serde(default)]
    pub presentation: Option<PresentationType>,
    /// 以子类型名称为键
    #[serde(skip)]
    vars: HashMap<String, Variable>,
    #[serde(skip)]
    node_id: Option<u8>,
}

impl Sensor {
    pub fn new(id: u8, node_id: u8) -> Self {
        Self {
            id,
            node_id: Some(node_id),
            ..Self::default()
        }
    }

    /// 所属节点 ID（快照载入后由 `Network` 重新挂接）。
    pub fn node_id(&self) -> Option<u8> {
        self.node_id
    }

    pub(crate) fn attach(&mut self, node_id: u8) {
        self.node_id = Some(node_id);
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.vars.iter()
    }

    /// 处理发往本传感器的消息；Req 返回待发送的回复。
    pub(crate) fn handle_message(
        &mut self,
        message: &Message,
        location: &str,
        metrics: &mut MetricsPolicy,
    ) -> Result<Option<Message>, NetworkError> {
        self.id = message.child_sensor_id;
        self.node_id = Some(message.node_id);

        match (message.message_type, message.sub_type) {
            (MessageType::Presentation, SubType::Presentation(presentation)) => {
                self.presentation = Some(presentation);
                info!(target: "mysgw.network", message = %message, "sensor_presented");
                Ok(None)
            }
            (MessageType::Set, SubType::SetReq(sub_type)) => {
                let name = sub_type.to_string();
                let payload = message.payload_str();
                match self.vars.get_mut(&name) {
                    Some(variable) => variable.set(&payload)?,
                    None => {
                        let variable = Variable::parse(sub_type, &payload)?;
                        self.vars.insert(name.clone(), variable);
                    }
                }
                if let Some(value) = self.vars.get(&name).and_then(Variable::as_float) {
                    let node = message.node_id.to_string();
                    let sensor = self.id.to_string();
                    let labels = [location, node.as_str(), sensor.as_str()];
                    if let Err(err) = metrics.observe(sub_type, labels, value) {
                        warn!(
                            target: "mysgw.network",
                            message = %message,
                            error = %err,
                            "metric_update_failed"
                        );
                    }
                }
                info!(target: "mysgw.network", message = %message, "variable_set");
                Ok(None)
            }
            (MessageType::Req, SubType::SetReq(sub_type)) => {
                let value = self
                    .vars
                    .get(&sub_type.to_string())
                    .map(Variable::value_string)
                    .unwrap_or_else(|| "0".to_string());
                info!(target: "mysgw.network", message = %message, value = %value, "variable_requested");
                Ok(Some(message.reply(SubType::SetReq(sub_type), value)))
            }
            _ => Ok(None),
        }
    }
}

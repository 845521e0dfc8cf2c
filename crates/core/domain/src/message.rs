//! 协议消息
//!
//! 一条消息是一个值对象；回复总是复制入站消息后覆盖子类型与负载，
//! 保留节点 ID、子传感器 ID、消息类型与 ACK 标志。

use crate::subtype::{SubType, wire_enum};
use crate::NO_CHILD;
use std::borrow::Cow;
use std::fmt;

wire_enum! {
    /// 消息类型。
    pub enum MessageType {
        Presentation = 0 => "presentation",
        Set = 1 => "set",
        Req = 2 => "req",
        Internal = 3 => "internal",
        Stream = 4 => "stream",
    }
}

/// ACK 标志。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AckType {
    #[default]
    NoAck,
    Ack,
}

/// 非法的 ACK 数值（只允许 0 / 1）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidAck(pub u8);

impl fmt::Display for InvalidAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ack value {}", self.0)
    }
}

impl std::error::Error for InvalidAck {}

impl AckType {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::NoAck => 0,
            Self::Ack => 1,
        }
    }
}

impl TryFrom<u8> for AckType {
    type Error = InvalidAck;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NoAck),
            1 => Ok(Self::Ack),
            other => Err(InvalidAck(other)),
        }
    }
}

impl fmt::Display for AckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAck => f.write_str("noack"),
            Self::Ack => f.write_str("ack"),
        }
    }
}

/// 一条完整的 MySensors 消息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// 节点 ID（0 为网关）
    pub node_id: u8,
    /// 子传感器 ID（255 表示节点级消息）
    pub child_sensor_id: u8,
    pub message_type: MessageType,
    pub ack: AckType,
    /// 子类型，含义由 `message_type` 决定
    pub sub_type: SubType,
    /// 原始负载（协议约定为文本或数字）
    pub payload: Vec<u8>,
}

impl Message {
    /// 构造消息，子类型数值按消息类型解释。
    pub fn new(
        node_id: u8,
        child_sensor_id: u8,
        message_type: MessageType,
        ack: AckType,
        sub_type: u8,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            node_id,
            child_sensor_id,
            message_type,
            ack,
            sub_type: SubType::for_type(message_type, sub_type),
            payload: payload.into(),
        }
    }

    /// 以本消息为模板构造回复：覆盖子类型与负载，其余字段保持不变。
    pub fn reply(&self, sub_type: SubType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            sub_type,
            payload: payload.into(),
            ..self.clone()
        }
    }

    /// 负载文本（非 UTF-8 字节按替换字符处理）。
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// 是否为发往节点本身（而非子传感器）的消息。
    pub fn is_node_level(&self) -> bool {
        self.child_sensor_id == NO_CHILD
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}",
            self.node_id,
            self.child_sensor_id,
            self.message_type,
            self.ack,
            self.sub_type,
            self.payload_str()
        )
    }
}

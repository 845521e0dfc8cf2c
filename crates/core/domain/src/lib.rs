//! MySensors 协议领域模型：所有模块共享的消息与子类型定义。

pub mod message;
pub mod subtype;

pub use message::{AckType, InvalidAck, Message, MessageType};
pub use subtype::{InternalType, PresentationType, SetReqType, SubType};

/// 网关自身的节点 ID。
pub const GATEWAY_ID: u8 = 0;

/// 节点级消息使用的占位子传感器 ID（非具体传感器）。
pub const NO_CHILD: u8 = 255;

/// 分配给普通节点的第一个 ID。
pub const FIRST_NODE_ID: u8 = 1;

//! # 串口协议能力模块
//!
//! 网关通过串口以行文本交换 MySensors 消息，本模块负责：
//! - **编解码**：消息 ↔ 一行 ASCII
//! - **链路收发**：阻塞读写泵，运行在独立线程
//! - **握手门控**：网关就绪前抑制所有回复
//! - **协议处理**：内部消息应答与向网络模型转发
//!
//! ## 数据流
//!
//! ```text
//! serial ──▶ run_reader ──▶ ProtocolHandler ──▶ Network
//!                               │                  │
//!                               └──▶ GatedSender ◀─┘
//!                                        │
//! serial ◀── run_writer ◀────────────────┘
//! ```

mod codec;
mod error;
mod gate;
mod handler;
mod link;

pub use codec::{decode, encode};
pub use error::{DecodeError, ProtocolError};
pub use gate::{GatedSender, LinkState, ReadinessGate, ReadyTrigger, ReplyOrigin};
pub use handler::{Disposition, METRIC_CONFIG, NodeIdSource, ProtocolHandler};
pub use link::{run_reader, run_writer};

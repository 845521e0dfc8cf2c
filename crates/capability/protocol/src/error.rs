//! 协议错误类型定义

/// 单行解码错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 字段数不是 6
    #[error("expected 6 fields, found {found}")]
    FieldCount { found: usize },

    /// 数字字段不是严格的十进制 u8
    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// ACK 只允许 0 / 1
    #[error("invalid ack value {0}")]
    InvalidAck(u8),
}

/// 链路与通道错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 写入字节数与帧长度不一致
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// 对端关闭链路（读到 EOF）
    #[error("link closed")]
    LinkClosed,

    /// 通道关闭
    #[error("channel closed")]
    ChannelClosed,
}

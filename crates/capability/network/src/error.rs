use domain::SetReqType;
use mysgw_protocol::ProtocolError;
use mysgw_telemetry::TelemetryError;
use std::path::PathBuf;

/// 消息建模错误：记录后跳过该消息的效果。
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("node {node_id}: child 255 only accepts internal messages, got {message_type}")]
    NodeLevelNotInternal { node_id: u8, message_type: String },
    #[error("{sub_type} expects a numeric payload, got {payload:?}")]
    InvalidFloat {
        sub_type: SetReqType,
        payload: String,
    },
    #[error("invalid battery level {payload:?}")]
    InvalidBattery { payload: String },
    #[error("metrics error: {0}")]
    Metrics(#[from] TelemetryError),
    #[error("reply failed: {0}")]
    Reply(#[from] ProtocolError),
}

/// 快照读写错误
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

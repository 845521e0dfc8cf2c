//! 追踪初始化与 Prometheus 指标。
//!
//! 指标注册表不是全局单例：由进程入口创建一个 [`prometheus::Registry`]，
//! 显式传给 [`MetricsPolicy`]（网络模型持有）与 [`LinkMetrics`]（链路各任务共享），
//! HTTP 层再用同一个注册表导出文本格式。

mod link;
mod policy;

pub use link::LinkMetrics;
pub use policy::{MetricsPolicy, SENSOR_LABELS, counter_name, gauge_name};
pub use prometheus::Registry;

use prometheus::{Encoder, TextEncoder};
use tracing_subscriber::{EnvFilter, fmt};

/// 指标错误。
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("counter {metric} cannot decrease (value {value})")]
    NegativeCounter { metric: &'static str, value: f64 },
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 将注册表内所有指标编码为 Prometheus 文本格式。
pub fn encode_text(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| TelemetryError::Encoding(err.to_string()))
}

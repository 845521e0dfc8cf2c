//! 指标导出策略
//!
//! 决定哪些 Set/Req 变量成为监控信号：
//!
//! | 变量 | gauge | counter |
//! |---|---|---|
//! | V_TEMP | temperature | |
//! | V_HUM | humidity | |
//! | V_PRESSURE | pressure | |
//! | V_LEVEL | light_level | |
//! | V_LIGHT_LEVEL | light_percent | |
//! | V_VOLUME | volume | volume_total |
//! | V_PERCENTAGE | battery_level | |
//! | V_VOLTAGE | battery_voltage | |
//!
//! 表外的变量不导出。gauge/counter 在某个变量首次出现时创建并注册，
//! 标签固定为 `{location, node, sensor}`。

use crate::TelemetryError;
use domain::SetReqType;
use prometheus::{CounterVec, GaugeVec, IntCounterVec, Opts, Registry};
use std::collections::HashMap;

/// 传感器数值指标的标签。
pub const SENSOR_LABELS: [&str; 3] = ["location", "node", "sensor"];

/// 变量对应的 gauge 名称。
pub fn gauge_name(sub_type: SetReqType) -> Option<&'static str> {
    match sub_type {
        SetReqType::Temp => Some("temperature"),
        SetReqType::Hum => Some("humidity"),
        SetReqType::Pressure => Some("pressure"),
        SetReqType::Level => Some("light_level"),
        SetReqType::LightLevel => Some("light_percent"),
        SetReqType::Volume => Some("volume"),
        SetReqType::Percentage => Some("battery_level"),
        SetReqType::Voltage => Some("battery_voltage"),
        _ => None,
    }
}

/// 变量对应的 counter 名称。
///
/// 同一注册表内不能同名，因此 volume 的 counter 带 `_total` 后缀。
pub fn counter_name(sub_type: SetReqType) -> Option<&'static str> {
    match sub_type {
        SetReqType::Volume => Some("volume_total"),
        _ => None,
    }
}

/// 指标导出策略（由网络模型持有）。
pub struct MetricsPolicy {
    registry: Registry,
    gauges: HashMap<SetReqType, GaugeVec>,
    counters: HashMap<SetReqType, CounterVec>,
    received_packets: IntCounterVec,
}

impl MetricsPolicy {
    /// 创建策略并注册节点收包计数器。
    pub fn new(registry: Registry) -> Result<Self, TelemetryError> {
        let received_packets = IntCounterVec::new(
            Opts::new(
                "mysensors_received_packets",
                "Packets received from sensor nodes",
            ),
            &["node", "location"],
        )?;
        registry.register(Box::new(received_packets.clone()))?;
        Ok(Self {
            registry,
            gauges: HashMap::new(),
            counters: HashMap::new(),
            received_packets,
        })
    }

    /// 使用独立注册表创建（测试或不导出指标的场景）。
    pub fn detached() -> Result<Self, TelemetryError> {
        Self::new(Registry::new())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 节点收包计数加一。
    pub fn record_packet(&self, node: &str, location: &str) {
        self.received_packets
            .with_label_values(&[node, location])
            .inc();
    }

    /// 记录一个变量数值；表外变量直接忽略。
    ///
    /// `labels` 顺序与 [`SENSOR_LABELS`] 一致。
    pub fn observe(
        &mut self,
        sub_type: SetReqType,
        labels: [&str; 3],
        value: f64,
    ) -> Result<(), TelemetryError> {
        if let Some(name) = gauge_name(sub_type) {
            if !self.gauges.contains_key(&sub_type) {
                let gauge = GaugeVec::new(Opts::new(name, help_text(sub_type)), &SENSOR_LABELS)?;
                self.registry.register(Box::new(gauge.clone()))?;
                self.gauges.insert(sub_type, gauge);
            }
            if let Some(gauge) = self.gauges.get(&sub_type) {
                gauge.with_label_values(&labels).set(value);
            }
        }

        if let Some(name) = counter_name(sub_type) {
            if value < 0.0 {
                return Err(TelemetryError::NegativeCounter {
                    metric: name,
                    value,
                });
            }
            if !self.counters.contains_key(&sub_type) {
                let counter =
                    CounterVec::new(Opts::new(name, help_text(sub_type)), &SENSOR_LABELS)?;
                self.registry.register(Box::new(counter.clone()))?;
                self.counters.insert(sub_type, counter);
            }
            if let Some(counter) = self.counters.get(&sub_type) {
                counter.with_label_values(&labels).inc_by(value);
            }
        }
        Ok(())
    }

    /// 当前 gauge 值（未创建时返回 `None`）。
    pub fn gauge_value(&self, sub_type: SetReqType, labels: [&str; 3]) -> Option<f64> {
        let gauge = self.gauges.get(&sub_type)?;
        gauge
            .get_metric_with_label_values(&labels)
            .ok()
            .map(|metric| metric.get())
    }

    /// 当前 counter 值（未创建时返回 `None`）。
    pub fn counter_value(&self, sub_type: SetReqType, labels: [&str; 3]) -> Option<f64> {
        let counter = self.counters.get(&sub_type)?;
        counter
            .get_metric_with_label_values(&labels)
            .ok()
            .map(|metric| metric.get())
    }

    /// 节点收包计数。
    pub fn packet_count(&self, node: &str, location: &str) -> u64 {
        self.received_packets
            .get_metric_with_label_values(&[node, location])
            .map(|metric| metric.get())
            .unwrap_or(0)
    }
}

fn help_text(sub_type: SetReqType) -> String {
    format!("MYSENSORS {}", sub_type)
}

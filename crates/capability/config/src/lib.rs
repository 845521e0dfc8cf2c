//! 应用运行配置加载。

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("failed to read {0}: {1}")]
    Read(String, String),
    #[error("malformed locations file {0}: {1}")]
    Malformed(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub serial_port: String,
    pub baud: u32,
    pub serial_timeout_ms: u64,
    pub state_file: PathBuf,
    pub locations_file: PathBuf,
    pub http_addr: String,
    /// 未设置时不连接总线
    pub mqtt_host: Option<String>,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub mqtt_client_prefix: String,
    pub bus_queue_capacity: usize,
    /// 0 表示关闭
    pub status_interval_seconds: u64,
    /// 0 表示关闭
    pub snapshot_interval_seconds: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let serial_port =
            env::var("MYSGW_SERIAL_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
        let baud = read_u32_with_default("MYSGW_BAUD", 115_200)?;
        let serial_timeout_ms = read_u64_with_default("MYSGW_SERIAL_TIMEOUT_MS", 1000)?;
        let state_file = env::var("MYSGW_STATE_FILE")
            .unwrap_or_else(|_| ".mysensors-state".to_string())
            .into();
        let locations_file = env::var("MYSGW_LOCATIONS_FILE")
            .unwrap_or_else(|_| "mysensors.cfg".to_string())
            .into();
        let http_addr = env::var("MYSGW_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:9001".to_string());
        let mqtt_host = read_optional("MYSGW_MQTT_HOST");
        let mqtt_port = read_u16_with_default("MYSGW_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("MYSGW_MQTT_USERNAME");
        let mqtt_password = read_optional("MYSGW_MQTT_PASSWORD");
        let mqtt_topic_prefix =
            env::var("MYSGW_MQTT_TOPIC_PREFIX").unwrap_or_else(|_| "mysensors".to_string());
        let mqtt_client_prefix =
            env::var("MYSGW_MQTT_CLIENT_PREFIX").unwrap_or_else(|_| "mysensors-".to_string());
        let bus_queue_capacity = read_u64_with_default("MYSGW_BUS_QUEUE_CAPACITY", 256)?;
        if bus_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "MYSGW_BUS_QUEUE_CAPACITY".to_string(),
                "0".to_string(),
            ));
        }
        let bus_queue_capacity = usize::try_from(bus_queue_capacity).map_err(|_| {
            ConfigError::Invalid(
                "MYSGW_BUS_QUEUE_CAPACITY".to_string(),
                bus_queue_capacity.to_string(),
            )
        })?;
        let status_interval_seconds = read_u64_with_default("MYSGW_STATUS_INTERVAL_SECONDS", 30)?;
        let snapshot_interval_seconds =
            read_u64_with_default("MYSGW_SNAPSHOT_INTERVAL_SECONDS", 300)?;

        Ok(Self {
            serial_port,
            baud,
            serial_timeout_ms,
            state_file,
            locations_file,
            http_addr,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_client_prefix,
            bus_queue_capacity,
            status_interval_seconds,
            snapshot_interval_seconds,
        })
    }
}

/// 节点位置配置：`{"locations": {"4": "outside"}}`。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationConfig {
    #[serde(default, alias = "Locations")]
    pub locations: HashMap<String, String>,
}

impl LocationConfig {
    /// 读取位置配置；文件不存在时返回空配置。
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(ConfigError::Read(
                    path.display().to_string(),
                    err.to_string(),
                ));
            }
        };
        serde_json::from_slice(&data)
            .map_err(|err| ConfigError::Malformed(path.display().to_string(), err.to_string()))
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

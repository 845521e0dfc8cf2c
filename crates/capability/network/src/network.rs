//! 网络模型
//!
//! 网络任务是拓扑的唯一修改者：按接收顺序逐条处理消息，
//! 节点与传感器按需创建、从不删除。

use crate::error::{NetworkError, SnapshotError};
use crate::ids::{NodeIdTracker, next_node_id};
use crate::node::Node;
use domain::{GATEWAY_ID, Message};
use mysgw_protocol::{GatedSender, ReplyOrigin};
use mysgw_telemetry::MetricsPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 快照文件结构：节点 → 传感器 → presentation。
///
/// 字段必须齐全且不允许多余字段，形状不符的文件按格式错误处理，
/// 不会被当作空网络载入后再覆盖。
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Snapshot {
    nodes: HashMap<String, Node>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    nodes: &'a HashMap<String, Node>,
}

pub struct Network {
    nodes: HashMap<String, Node>,
    metrics: MetricsPolicy,
    replies: GatedSender,
    locations: HashMap<String, String>,
    ids: NodeIdTracker,
}

impl Network {
    pub fn new(metrics: MetricsPolicy, replies: GatedSender) -> Self {
        Self {
            nodes: HashMap::new(),
            metrics,
            replies,
            locations: HashMap::new(),
            ids: NodeIdTracker::default(),
        }
    }

    /// 从快照恢复；文件不存在时返回空网络，格式错误时返回错误。
    pub fn load(
        path: &Path,
        metrics: MetricsPolicy,
        replies: GatedSender,
    ) -> Result<Self, SnapshotError> {
        let mut network = Self::new(metrics, replies);
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(target: "mysgw.network", path = %path.display(), "snapshot_missing_starting_empty");
                return Ok(network);
            }
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let snapshot: Snapshot =
            serde_json::from_slice(&data).map_err(|source| SnapshotError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        network.nodes = snapshot.nodes;
        network.reattach();
        info!(
            target: "mysgw.network",
            path = %path.display(),
            nodes = network.nodes.len(),
            "snapshot_loaded"
        );
        Ok(network)
    }

    /// 写入快照（先写临时文件再原子替换）。
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let data = serde_json::to_vec_pretty(&SnapshotRef { nodes: &self.nodes })?;
        let tmp = temp_path(path);
        fs::write(&tmp, data).map_err(|source| SnapshotError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(target: "mysgw.network", path = %path.display(), nodes = self.nodes.len(), "snapshot_saved");
        Ok(())
    }

    /// 载入后重建回指并刷新节点 ID。
    fn reattach(&mut self) {
        for node in self.nodes.values_mut() {
            node.reattach();
            if let Some(location) = self.locations.get(&node.id.to_string()) {
                node.location = location.clone();
            }
        }
        self.refresh_next_id();
    }

    /// 设置节点位置标签，立即应用到已有节点，之后新建的节点也会使用。
    pub fn set_locations(&mut self, locations: HashMap<String, String>) {
        self.locations = locations;
        self.reattach();
    }

    /// 协议处理器读取的节点 ID 来源。
    pub fn id_source(&self) -> NodeIdTracker {
        self.ids.clone()
    }

    pub fn next_node_id(&self) -> Option<u8> {
        next_node_id(self.nodes.values().map(|node| node.id))
    }

    fn refresh_next_id(&self) {
        self.ids.update(self.next_node_id());
    }

    pub fn node(&self, node_id: u8) -> Option<&Node> {
        self.nodes.get(&node_id.to_string())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn metrics(&self) -> &MetricsPolicy {
        &self.metrics
    }

    /// 处理一条转发来的消息；Req 的回复经门控发送。
    pub async fn handle_message(&mut self, message: &Message) -> Result<(), NetworkError> {
        if message.node_id == GATEWAY_ID {
            info!(target: "mysgw.network", message = %message, "gateway_message");
        }
        let locations = &self.locations;
        let node = self
            .nodes
            .entry(message.node_id.to_string())
            .or_insert_with_key(|key| {
                let location = locations.get(key).cloned().unwrap_or_default();
                info!(
                    target: "mysgw.network",
                    node_id = message.node_id,
                    location = %location,
                    "node_discovered"
                );
                Node::new(message.node_id, location)
            });
        let result = node.handle_message(message, &mut self.metrics);
        self.refresh_next_id();

        if let Some(reply) = result? {
            self.replies.send(reply, ReplyOrigin::Network).await?;
        }
        Ok(())
    }

    /// 按 ID 排序的人类可读状态。
    pub fn status_report(&self) -> String {
        let mut out = String::new();
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_key(|node| node.id);
        for node in nodes {
            let _ = writeln!(
                out,
                "Node {} [{} {}]    Location: {}    Battery: {}%",
                node.id, node.sketch_name, node.sketch_version, node.location, node.battery
            );
            let mut sensors: Vec<_> = node.sensors.values().collect();
            sensors.sort_by_key(|sensor| sensor.id);
            for sensor in sensors {
                let presentation = sensor
                    .presentation
                    .map(|presentation| presentation.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let _ = write!(out, " Sensor {} [{}]:", sensor.id, presentation);
                let mut vars: Vec<_> = sensor.variables().collect();
                vars.sort_by(|a, b| a.0.cmp(b.0));
                for (name, variable) in vars {
                    let _ = write!(out, "  {}: {}", name, variable.value_string());
                }
                out.push('\n');
            }
        }
        out
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

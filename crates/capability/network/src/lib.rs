//! # 网络模型
//!
//! 权威的内存拓扑：`Network → Node → Sensor → Variable`。
//!
//! - 节点以十进制节点 ID 为键，传感器以十进制子传感器 ID 为键，变量以子类型名称为键
//! - 快照只保存拓扑与节点属性，变量值与回指不落盘，载入后显式重建回指
//! - 数值型变量的更新同时写入指标策略

mod error;
mod ids;
mod network;
mod node;
mod sensor;
mod variable;

pub use error::{NetworkError, SnapshotError};
pub use ids::{NodeIdTracker, next_node_id};
pub use network::Network;
pub use node::Node;
pub use sensor::Sensor;
pub use variable::Variable;

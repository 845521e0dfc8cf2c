//! 网络任务
//!
//! 网络模型只在这个任务里被修改。消息按接收顺序处理，处理成功的消息
//! 再投递到总线；周期性输出状态与落盘快照，退出前总会保存一次快照。

use domain::Message;
use mysgw_bus::BusForwarder;
use mysgw_network::Network;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

/// 网络任务配置
#[derive(Debug, Clone)]
pub struct NetworkLoopConfig {
    pub state_file: PathBuf,
    /// `None` 表示不输出状态
    pub status_interval: Option<Duration>,
    /// `None` 表示只在退出时保存
    pub snapshot_interval: Option<Duration>,
}

impl NetworkLoopConfig {
    pub fn from_seconds(state_file: PathBuf, status_seconds: u64, snapshot_seconds: u64) -> Self {
        let every = |seconds: u64| (seconds > 0).then(|| Duration::from_secs(seconds));
        Self {
            state_file,
            status_interval: every(status_seconds),
            snapshot_interval: every(snapshot_seconds),
        }
    }
}

/// 网络任务退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 收到停机信号
    Shutdown,
    /// 上游通道关闭（链路读端已停止）
    LinkClosed,
}

pub async fn run_network(
    mut network: Network,
    mut rx: mpsc::Receiver<Message>,
    bus: BusForwarder,
    config: NetworkLoopConfig,
    mut shutdown: watch::Receiver<bool>,
) -> StopReason {
    let mut status = config.status_interval.map(delayed_interval);
    let mut snapshot = config.snapshot_interval.map(delayed_interval);

    let reason = loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(message) = received else {
                    break StopReason::LinkClosed;
                };
                match network.handle_message(&message).await {
                    Ok(()) => {
                        bus.forward(message);
                    }
                    Err(err) => {
                        warn!(
                            target: "mysgw.network",
                            message = %message,
                            error = %err,
                            "message_handling_failed"
                        );
                    }
                }
            }
            _ = tick(&mut status) => {
                info!(target: "mysgw.bridge", "network_status\n{}", network.status_report());
            }
            _ = tick(&mut snapshot) => {
                save_snapshot(&network, &config);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break StopReason::Shutdown;
                }
            }
        }
    };

    save_snapshot(&network, &config);
    info!(target: "mysgw.bridge", reason = ?reason, "network_loop_stopped");
    reason
}

fn save_snapshot(network: &Network, config: &NetworkLoopConfig) {
    if let Err(err) = network.save(&config.state_file) {
        warn!(
            target: "mysgw.bridge",
            path = %config.state_file.display(),
            error = %err,
            "snapshot_save_failed"
        );
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

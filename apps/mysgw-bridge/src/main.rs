//! MySensors 串口网关桥接服务。
//!
//! 串口 ──▶ 读端 ──▶ 协议处理器 ──▶ 网络任务 ──▶ 总线
//!   ▲                  │               │
//!   └──── 写端 ◀───────┴── 门控回复 ◀──┘

mod bridge;
mod http;

use bridge::{NetworkLoopConfig, StopReason, run_network};
use domain::Message;
use mysgw_bus::{BusForwarder, MessagePublisher, MqttPublisher, MqttPublisherConfig, NoopPublisher};
use mysgw_config::{AppConfig, LocationConfig};
use mysgw_network::Network;
use mysgw_protocol::{GatedSender, ProtocolHandler, ReadinessGate, run_reader, run_writer};
use mysgw_telemetry::{LinkMetrics, MetricsPolicy, Registry, init_tracing};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// 任务间通道容量
const CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 指标注册表：网络模型与链路计数器共用，/metrics 导出
    let registry = Registry::new();
    let link_metrics = LinkMetrics::register(&registry)?;
    let policy = MetricsPolicy::new(registry.clone())?;

    // 两个回复生产者共用同一个门控发送端
    let (tx_link, rx_link) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
    let replies = GatedSender::new(tx_link, ReadinessGate::new(), link_metrics.clone());

    // 恢复快照，应用位置配置
    let mut network = Network::load(&config.state_file, policy, replies.clone())?;
    let locations = LocationConfig::load(&config.locations_file)?;
    network.set_locations(locations.locations);

    // 串口 8N1，读超时只用于让读线程周期性醒来
    let port = serialport::new(config.serial_port.as_str(), config.baud)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(config.serial_timeout_ms))
        .open()?;
    let writer_port = port.try_clone()?;
    info!(
        target: "mysgw.bridge",
        port = %config.serial_port,
        baud = config.baud,
        "serial_opened"
    );

    let publisher: Arc<dyn MessagePublisher> = match config.mqtt_host.clone() {
        Some(host) => {
            let (publisher, _eventloop) = MqttPublisher::connect(MqttPublisherConfig {
                host,
                port: config.mqtt_port,
                username: config.mqtt_username.clone(),
                password: config.mqtt_password.clone(),
                topic_prefix: config.mqtt_topic_prefix.clone(),
                client_prefix: config.mqtt_client_prefix.clone(),
            })?;
            Arc::new(publisher)
        }
        None => {
            info!(target: "mysgw.bridge", "bus_disabled");
            Arc::new(NoopPublisher)
        }
    };
    let (bus, _bus_task) =
        BusForwarder::spawn(publisher, config.bus_queue_capacity, link_metrics.clone());

    let (tx_inbound, rx_inbound) = mpsc::channel(CHANNEL_CAPACITY);
    let (tx_network, rx_network) = mpsc::channel(CHANNEL_CAPACITY);

    let reader_metrics = link_metrics.clone();
    let reader = tokio::task::spawn_blocking(move || {
        run_reader(BufReader::new(port), tx_inbound, reader_metrics)
    });
    let mut writer =
        tokio::task::spawn_blocking(move || run_writer(writer_port, rx_link, link_metrics));

    let handler = ProtocolHandler::new(Arc::new(network.id_source()), replies);
    tokio::spawn(async move {
        if let Err(err) = handler.run(rx_inbound, tx_network).await {
            warn!(target: "mysgw.handler", error = %err, "handler_failed");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_config = NetworkLoopConfig::from_seconds(
        config.state_file.clone(),
        config.status_interval_seconds,
        config.snapshot_interval_seconds,
    );
    let mut network_task = tokio::spawn(run_network(
        network,
        rx_network,
        bus,
        loop_config,
        shutdown_rx,
    ));

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "mysgw.bridge", addr = %config.http_addr, "http_listening");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, http::router(registry)).await {
            error!(target: "mysgw.bridge", error = %err, "http_server_failed");
        }
    });

    // 读线程在串口上阻塞，运行时无法正常退出，所以保存快照后直接结束进程
    let code = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(target: "mysgw.bridge", error = %err, "signal_listener_failed");
            }
            info!(target: "mysgw.bridge", "shutdown_requested");
            let _ = shutdown_tx.send(true);
            let _ = network_task.await;
            0
        }
        written = &mut writer => {
            match written {
                Ok(Err(err)) => error!(target: "mysgw.link", error = %err, "link_write_failed"),
                Ok(Ok(())) => error!(target: "mysgw.link", "link_writer_stopped"),
                Err(err) => error!(target: "mysgw.link", error = %err, "link_writer_panicked"),
            }
            let _ = shutdown_tx.send(true);
            let _ = network_task.await;
            1
        }
        stopped = &mut network_task => {
            if let Ok(StopReason::LinkClosed) = stopped {
                match reader.await {
                    Ok(Err(err)) => error!(target: "mysgw.link", error = %err, "link_read_failed"),
                    Ok(Ok(())) => error!(target: "mysgw.link", "link_reader_stopped"),
                    Err(err) => error!(target: "mysgw.link", error = %err, "link_reader_panicked"),
                }
            }
            1
        }
    };
    std::process::exit(code)
}

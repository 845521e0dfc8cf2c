//! 链路收发
//!
//! 串口句柄是阻塞 IO，两个方向各自运行在 `spawn_blocking` 线程里：
//! - 读端：按 `\n` 切行 → 解码 → 送入下游通道；解码失败记录并跳过
//! - 写端：从发送通道取消息 → 编码 → 单次写入；短写或写错误直接返回错误

use crate::codec::{decode, encode};
use crate::error::ProtocolError;
use domain::Message;
use mysgw_telemetry::LinkMetrics;
use std::io::{BufRead, ErrorKind, Write};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 读端循环。
///
/// 读超时只是没有数据，已读到的半行保留到下次继续拼接。
/// 下游通道关闭时返回 `Ok(())`；EOF 或其他读错误返回 `Err`，
/// 两种情况都会释放发送端，使下游通道关闭。
pub fn run_reader<R: BufRead>(
    mut reader: R,
    tx: mpsc::Sender<Message>,
    metrics: LinkMetrics,
) -> Result<(), ProtocolError> {
    let mut line = Vec::new();
    loop {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                if !line.is_empty() {
                    warn!(
                        target: "mysgw.link",
                        raw = %String::from_utf8_lossy(&line),
                        "partial_line_discarded"
                    );
                }
                return Err(ProtocolError::LinkClosed);
            }
            Ok(_) if line.last() != Some(&b'\n') => continue,
            Ok(_) => {
                match decode(&line) {
                    Ok(message) => {
                        metrics.record_rx_message();
                        if message.node_id == domain::GATEWAY_ID {
                            debug!(target: "mysgw.link", message = %message, "gateway_message_received");
                        } else {
                            debug!(target: "mysgw.link", message = %message, "message_received");
                        }
                        if tx.blocking_send(message).is_err() {
                            info!(target: "mysgw.link", "reader_downstream_closed");
                            return Ok(());
                        }
                    }
                    Err(err) => {
                        metrics.record_decode_error();
                        warn!(
                            target: "mysgw.link",
                            raw = %String::from_utf8_lossy(&line).trim_end(),
                            error = %err,
                            "decode_failed"
                        );
                    }
                }
                line.clear();
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(err) => return Err(ProtocolError::Io(err)),
        }
    }
}

/// 写端循环；发送通道关闭时返回 `Ok(())`。
pub fn run_writer<W: Write>(
    mut writer: W,
    mut rx: mpsc::Receiver<Message>,
    metrics: LinkMetrics,
) -> Result<(), ProtocolError> {
    while let Some(message) = rx.blocking_recv() {
        let frame = encode(&message);
        let written = loop {
            match writer.write(&frame) {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                other => break other?,
            }
        };
        if written != frame.len() {
            return Err(ProtocolError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        writer.flush()?;
        metrics.record_tx_message();
        debug!(target: "mysgw.link", message = %message, "message_sent");
    }
    info!(target: "mysgw.link", "writer_channel_closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    /// 先返回数据片段，再返回超时，模拟串口读超时。
    struct Chunked {
        chunks: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            match self.chunks.remove(0) {
                Ok(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Err(err) => Err(err),
            }
        }
    }

    #[test]
    fn reader_skips_bad_lines() {
        let input = Cursor::new(b"garbage\n4;1;1;0;0;21.5\n1;2;3\n".to_vec());
        let (tx, mut rx) = mpsc::channel(8);
        let metrics = LinkMetrics::detached().expect("metrics");

        let result = run_reader(input, tx, metrics.clone());
        assert!(matches!(result, Err(ProtocolError::LinkClosed)));

        let message = rx.try_recv().expect("one message");
        assert_eq!(message.payload, b"21.5".to_vec());
        assert!(rx.try_recv().is_err());
        assert_eq!(metrics.rx_messages(), 1);
        assert_eq!(metrics.decode_errors(), 2);
    }

    #[test]
    fn reader_keeps_partial_line_across_timeouts() {
        let source = Chunked {
            chunks: vec![
                Ok(b"4;1;1;".to_vec()),
                Err(io::Error::new(ErrorKind::TimedOut, "timeout")),
                Ok(b"0;0;19.0\n".to_vec()),
            ],
        };
        let (tx, mut rx) = mpsc::channel(8);
        let metrics = LinkMetrics::detached().expect("metrics");

        let _ = run_reader(BufReader::new(source), tx, metrics);
        let message = rx.try_recv().expect("joined message");
        assert_eq!(message.node_id, 4);
        assert_eq!(message.payload, b"19.0".to_vec());
    }

    #[test]
    fn reader_stops_on_io_error() {
        let source = Chunked {
            chunks: vec![Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))],
        };
        let (tx, _rx) = mpsc::channel(8);
        let metrics = LinkMetrics::detached().expect("metrics");

        let result = run_reader(BufReader::new(source), tx, metrics);
        assert!(matches!(result, Err(ProtocolError::Io(_))));
    }

    struct ShortWriter;

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len() / 2)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_encodes_frames() {
        let (tx, rx) = mpsc::channel(8);
        tx.try_send(decode(b"0;255;3;0;6;M\n").expect("decode"))
            .expect("queue");
        drop(tx);
        let metrics = LinkMetrics::detached().expect("metrics");

        let mut sink = Vec::new();
        run_writer(&mut sink, rx, metrics.clone()).expect("writer");
        assert_eq!(sink, b"0;255;3;0;6;M\n".to_vec());
        assert_eq!(metrics.tx_messages(), 1);
    }

    #[test]
    fn writer_short_write_is_fatal() {
        let (tx, rx) = mpsc::channel(8);
        tx.try_send(decode(b"0;255;3;0;6;M\n").expect("decode"))
            .expect("queue");
        let metrics = LinkMetrics::detached().expect("metrics");

        let result = run_writer(ShortWriter, rx, metrics);
        assert!(matches!(result, Err(ProtocolError::ShortWrite { .. })));
    }
}

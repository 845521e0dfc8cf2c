//! 线路编解码
//!
//! 一条消息对应一行 ASCII 文本：
//!
//! ```text
//! node-id;child-sensor-id;type;ack;sub-type;payload\n
//! ```
//!
//! 前五个字段为严格十进制（不接受符号、空白与溢出），负载原样保留。

use crate::error::DecodeError;
use domain::{AckType, Message, MessageType};

const FIELD_COUNT: usize = 6;

/// 编码为一行（含结尾换行）。
pub fn encode(message: &Message) -> Vec<u8> {
    let mut frame = format!(
        "{};{};{};{};{};",
        message.node_id,
        message.child_sensor_id,
        message.message_type.as_u8(),
        message.ack.as_u8(),
        message.sub_type.as_u8()
    )
    .into_bytes();
    frame.extend_from_slice(&message.payload);
    frame.push(b'\n');
    frame
}

/// 解码一行；至多去掉一个结尾换行。
pub fn decode(line: &[u8]) -> Result<Message, DecodeError> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let fields: Vec<&[u8]> = line.split(|byte| *byte == b';').collect();
    if fields.len() != FIELD_COUNT {
        return Err(DecodeError::FieldCount {
            found: fields.len(),
        });
    }

    let node_id = parse_u8("node-id", fields[0])?;
    let child_sensor_id = parse_u8("child-sensor-id", fields[1])?;
    let message_type = MessageType::from_u8(parse_u8("type", fields[2])?);
    let ack = AckType::try_from(parse_u8("ack", fields[3])?)
        .map_err(|invalid| DecodeError::InvalidAck(invalid.0))?;
    let sub_type = parse_u8("sub-type", fields[4])?;

    Ok(Message::new(
        node_id,
        child_sensor_id,
        message_type,
        ack,
        sub_type,
        fields[5],
    ))
}

fn parse_u8(field: &'static str, raw: &[u8]) -> Result<u8, DecodeError> {
    let invalid = || DecodeError::InvalidField {
        field,
        value: String::from_utf8_lossy(raw).into_owned(),
    };
    if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<u8>().ok())
        .ok_or_else(invalid)
}

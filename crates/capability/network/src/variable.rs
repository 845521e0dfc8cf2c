use crate::error::NetworkError;
use domain::SetReqType;

/// 传感器变量的最近值；种类在首次观察时确定。
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Float { sub_type: SetReqType, value: f64 },
    Text { sub_type: SetReqType, value: String },
}

impl Variable {
    /// 按变量种类创建；数值型变量的负载解析失败时不创建。
    pub fn parse(sub_type: SetReqType, payload: &str) -> Result<Self, NetworkError> {
        if sub_type.is_numeric() {
            Ok(Self::Float {
                sub_type,
                value: parse_float(sub_type, payload)?,
            })
        } else {
            Ok(Self::Text {
                sub_type,
                value: payload.to_string(),
            })
        }
    }

    /// 更新值；数值型解析失败时保留旧值。
    pub fn set(&mut self, payload: &str) -> Result<(), NetworkError> {
        match self {
            Self::Float { sub_type, value } => {
                *value = parse_float(*sub_type, payload)?;
            }
            Self::Text { value, .. } => {
                *value = payload.to_string();
            }
        }
        Ok(())
    }

    pub fn sub_type(&self) -> SetReqType {
        match self {
            Self::Float { sub_type, .. } | Self::Text { sub_type, .. } => *sub_type,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float { value, .. } => Some(*value),
            Self::Text { .. } => None,
        }
    }

    /// 回复 Req 时使用的文本形式（浮点保留两位小数）。
    pub fn value_string(&self) -> String {
        match self {
            Self::Float { value, .. } => format!("{:.2}", value),
            Self::Text { value, .. } => value.clone(),
        }
    }
}

fn parse_float(sub_type: SetReqType, payload: &str) -> Result<f64, NetworkError> {
    payload
        .parse::<f64>()
        .map_err(|_| NetworkError::InvalidFloat {
            sub_type,
            payload: payload.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_subtype() {
        let temp = Variable::parse(SetReqType::Temp, "21.5").expect("float");
        assert_eq!(temp.as_float(), Some(21.5));
        assert_eq!(temp.value_string(), "21.50");

        let status = Variable::parse(SetReqType::Status, "1").expect("text");
        assert_eq!(status.as_float(), None);
        assert_eq!(status.value_string(), "1");
    }

    #[test]
    fn bad_payload_keeps_previous_value() {
        let mut temp = Variable::parse(SetReqType::Temp, "21.5").expect("float");
        assert!(temp.set("warm").is_err());
        assert_eq!(temp.as_float(), Some(21.5));
    }

    #[test]
    fn text_never_becomes_float() {
        let mut status = Variable::parse(SetReqType::Status, "on").expect("text");
        status.set("3.5").expect("text set");
        assert_eq!(status.as_float(), None);
        assert_eq!(status.sub_type(), SetReqType::Status);
    }
}

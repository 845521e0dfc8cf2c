//! 消息子类型定义
//!
//! 线路上子类型只是一个 0-255 的整数，其含义取决于消息类型：
//! - Presentation 消息：传感器类型（`S_*`）
//! - Set / Req 消息：变量类型（`V_*`）
//! - Internal 消息：内部指令（`I_*`）
//!
//! 三套枚举共享同一数值空间，因此 [`SubType`] 是按消息类型打标签的联合体，
//! 解码时必须先确定消息类型再解释子类型数值。

use crate::message::MessageType;
use std::fmt;

/// 定义与线路数值一一对应的枚举。
///
/// 每个枚举额外带一个 `Unknown(u8)` 变体，保存本实现未识别的数值，
/// 使新固件发送的子类型可以原样透传。`Unknown` 只应由 `from_u8` 构造。
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident = $value:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "u8", into = "u8")]
        pub enum $name {
            $( $variant, )+
            /// 未识别的数值。
            Unknown(u8),
        }

        impl $name {
            /// 由线路数值构造。
            pub fn from_u8(value: u8) -> Self {
                match value {
                    $( $value => Self::$variant, )+
                    other => Self::Unknown(other),
                }
            }

            /// 线路数值。
            pub fn as_u8(self) -> u8 {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Unknown(value) => value,
                }
            }

            /// 协议中的名称；未识别的数值返回 `None`。
            pub fn label(self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($label), )+
                    Self::Unknown(_) => None,
                }
            }
        }

        impl From<u8> for $name {
            fn from(value: u8) -> Self {
                Self::from_u8(value)
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value.as_u8()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.label() {
                    Some(label) => f.write_str(label),
                    None => write!(f, "UNKNOWN({})", self.as_u8()),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Presentation 消息的子类型：节点声明的传感器种类。
    pub enum PresentationType {
        Door = 0 => "S_DOOR",
        Motion = 1 => "S_MOTION",
        Smoke = 2 => "S_SMOKE",
        Light = 3 => "S_LIGHT",
        Dimmer = 4 => "S_DIMMER",
        Cover = 5 => "S_COVER",
        Temp = 6 => "S_TEMP",
        Hum = 7 => "S_HUM",
        Baro = 8 => "S_BARO",
        Wind = 9 => "S_WIND",
        Rain = 10 => "S_RAIN",
        Uv = 11 => "S_UV",
        Weight = 12 => "S_WEIGHT",
        Power = 13 => "S_POWER",
        Heater = 14 => "S_HEATER",
        Distance = 15 => "S_DISTANCE",
        LightLevel = 16 => "S_LIGHT_LEVEL",
        ArduinoNode = 17 => "S_ARDUINO_NODE",
        ArduinoRepeaterNode = 18 => "S_ARDUINO_REPEATER_NODE",
        Lock = 19 => "S_LOCK",
        Ir = 20 => "S_IR",
        Water = 21 => "S_WATER",
        AirQuality = 22 => "S_AIR_QUALITY",
        Custom = 23 => "S_CUSTOM",
        Dust = 24 => "S_DUST",
        SceneController = 25 => "S_SCENE_CONTROLLER",
        RgbLight = 26 => "S_RGB_LIGHT",
        RgbwLight = 27 => "S_RGBW_LIGHT",
        ColorSensor = 28 => "S_COLOR_SENSOR",
        Hvac = 29 => "S_HVAC",
        Multimeter = 30 => "S_MULTIMETER",
        Sprinkler = 31 => "S_SPRINKLER",
        WaterLeak = 32 => "S_WATER_LEAK",
        Sound = 33 => "S_SOUND",
        Vibration = 34 => "S_VIBRATION",
        Moisture = 35 => "S_MOISTURE",
    }
}

wire_enum! {
    /// Set / Req 消息的子类型：变量种类。
    ///
    /// `V_LIGHT`、`V_DIMMER` 是 `V_STATUS`、`V_PERCENTAGE` 的旧名，数值相同。
    pub enum SetReqType {
        Temp = 0 => "V_TEMP",
        Hum = 1 => "V_HUM",
        Status = 2 => "V_STATUS",
        Percentage = 3 => "V_PERCENTAGE",
        Pressure = 4 => "V_PRESSURE",
        Forecast = 5 => "V_FORECAST",
        Rain = 6 => "V_RAIN",
        RainRate = 7 => "V_RAINRATE",
        Wind = 8 => "V_WIND",
        Gust = 9 => "V_GUST",
        Direction = 10 => "V_DIRECTION",
        Uv = 11 => "V_UV",
        Weight = 12 => "V_WEIGHT",
        Distance = 13 => "V_DISTANCE",
        Impedance = 14 => "V_IMPEDANCE",
        Armed = 15 => "V_ARMED",
        Tripped = 16 => "V_TRIPPED",
        Watt = 17 => "V_WATT",
        Kwh = 18 => "V_KWH",
        SceneOn = 19 => "V_SCENE_ON",
        SceneOff = 20 => "V_SCENE_OFF",
        HvacFlowState = 21 => "V_HVAC_FLOW_STATE",
        HvacSpeed = 22 => "V_HVAC_SPEED",
        LightLevel = 23 => "V_LIGHT_LEVEL",
        Var1 = 24 => "V_VAR1",
        Var2 = 25 => "V_VAR2",
        Var3 = 26 => "V_VAR3",
        Var4 = 27 => "V_VAR4",
        Var5 = 28 => "V_VAR5",
        Up = 29 => "V_UP",
        Down = 30 => "V_DOWN",
        Stop = 31 => "V_STOP",
        IrSend = 32 => "V_IR_SEND",
        IrReceive = 33 => "V_IR_RECEIVE",
        Flow = 34 => "V_FLOW",
        Volume = 35 => "V_VOLUME",
        LockStatus = 36 => "V_LOCK_STATUS",
        Level = 37 => "V_LEVEL",
        Voltage = 38 => "V_VOLTAGE",
        Current = 39 => "V_CURRENT",
        Rgb = 40 => "V_RGB",
        Rgbw = 41 => "V_RGBW",
        Id = 42 => "V_ID",
        UnitPrefix = 43 => "V_UNIT_PREFIX",
        HvacSetpointCool = 44 => "V_HVAC_SETPOINT_COOL",
        HvacSetpointHeat = 45 => "V_HVAC_SETPOINT_HEAT",
        HvacFlowMode = 46 => "V_HVAC_FLOW_MODE",
    }
}

impl SetReqType {
    /// 是否按浮点数保存的变量种类。
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Temp
                | Self::Hum
                | Self::Pressure
                | Self::Level
                | Self::Volume
                | Self::Voltage
                | Self::LightLevel
        )
    }
}

wire_enum! {
    /// Internal 消息的子类型。
    pub enum InternalType {
        BatteryLevel = 0 => "I_BATTERY_LEVEL",
        Time = 1 => "I_TIME",
        Version = 2 => "I_VERSION",
        IdRequest = 3 => "I_ID_REQUEST",
        IdResponse = 4 => "I_ID_RESPONSE",
        InclusionMode = 5 => "I_INCLUSION_MODE",
        Config = 6 => "I_CONFIG",
        FindParent = 7 => "I_FIND_PARENT",
        FindParentResponse = 8 => "I_FIND_PARENT_RESPONSE",
        LogMessage = 9 => "I_LOG_MESSAGE",
        Children = 10 => "I_CHILDREN",
        SketchName = 11 => "I_SKETCH_NAME",
        SketchVersion = 12 => "I_SKETCH_VERSION",
        Reboot = 13 => "I_REBOOT",
        GatewayReady = 14 => "I_GATEWAY_READY",
        RequestSigning = 15 => "I_REQUEST_SIGNING",
        GetNonce = 16 => "I_GET_NONCE",
        GetNonceResponse = 17 => "I_GET_NONCE_RESPONSE",
    }
}

/// 按消息类型解释后的子类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubType {
    Presentation(PresentationType),
    SetReq(SetReqType),
    Internal(InternalType),
    /// 消息类型为 Stream 或未知时，子类型不作解释，仅保留线路数值。
    Raw(u8),
}

impl SubType {
    /// 依据已解析的消息类型解释子类型数值。
    pub fn for_type(message_type: MessageType, value: u8) -> Self {
        match message_type {
            MessageType::Presentation => Self::Presentation(PresentationType::from_u8(value)),
            MessageType::Set | MessageType::Req => Self::SetReq(SetReqType::from_u8(value)),
            MessageType::Internal => Self::Internal(InternalType::from_u8(value)),
            MessageType::Stream | MessageType::Unknown(_) => Self::Raw(value),
        }
    }

    /// 线路数值。
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Presentation(value) => value.as_u8(),
            Self::SetReq(value) => value.as_u8(),
            Self::Internal(value) => value.as_u8(),
            Self::Raw(value) => value,
        }
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presentation(value) => fmt::Display::fmt(value, f),
            Self::SetReq(value) => fmt::Display::fmt(value, f),
            Self::Internal(value) => fmt::Display::fmt(value, f),
            Self::Raw(value) => write!(f, "{}", value),
        }
    }
}

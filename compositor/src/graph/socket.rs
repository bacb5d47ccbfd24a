//! Socket model for the compositor graph.

use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declared value kind of a socket.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    /// Single channel float (image or single value)
    Float,
    /// Three component vector
    Vector,
    /// RGBA color
    Color,
    /// Shader closure, only meaningful for material nodes
    Shader,
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SocketType::Float => "float",
            SocketType::Vector => "vector",
            SocketType::Color => "color",
            SocketType::Shader => "shader",
        };
        write!(f, "{}", s)
    }
}

/// Value carried by an unlinked input socket or a node property.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SocketValue {
    Float(OrderedFloat<f32>),
    Vector([OrderedFloat<f32>; 3]),
    Color([OrderedFloat<f32>; 4]),
}

impl SocketValue {
    pub fn float(value: f32) -> Self {
        SocketValue::Float(OrderedFloat(value))
    }

    pub fn vector(value: [f32; 3]) -> Self {
        SocketValue::Vector(value.map(OrderedFloat))
    }

    pub fn color(value: [f32; 4]) -> Self {
        SocketValue::Color(value.map(OrderedFloat))
    }

    /// The zero value for the given socket type. Shader sockets have none.
    pub fn zero(socket_type: SocketType) -> Option<Self> {
        match socket_type {
            SocketType::Float => Some(Self::float(0.0)),
            SocketType::Vector => Some(Self::vector([0.0; 3])),
            SocketType::Color => Some(Self::color([0.0; 4])),
            SocketType::Shader => None,
        }
    }

    pub fn socket_type(&self) -> SocketType {
        match self {
            SocketValue::Float(_) => SocketType::Float,
            SocketValue::Vector(_) => SocketType::Vector,
            SocketValue::Color(_) => SocketType::Color,
        }
    }

    /// Unpack into four channels, padding vectors with zero and floats by
    /// repetition so that every socket value fits a pixel.
    pub fn to_pixel(&self) -> [f32; 4] {
        match self {
            SocketValue::Float(v) => [v.0, v.0, v.0, v.0],
            SocketValue::Vector(v) => [v[0].0, v[1].0, v[2].0, 0.0],
            SocketValue::Color(c) => [c[0].0, c[1].0, c[2].0, c[3].0],
        }
    }

    /// Implicitly convert to another socket type, the way links between
    /// mismatched sockets do.
    pub fn convert_to(&self, target: SocketType) -> Option<SocketValue> {
        let converted = match (self, target) {
            (_, SocketType::Shader) => return None,
            (value, target) if value.socket_type() == target => *value,
            (SocketValue::Float(v), SocketType::Vector) => Self::vector([v.0; 3]),
            (SocketValue::Float(v), SocketType::Color) => Self::color([v.0, v.0, v.0, 1.0]),
            (SocketValue::Vector(v), SocketType::Float) => {
                Self::float((v[0].0 + v[1].0 + v[2].0) / 3.0)
            }
            (SocketValue::Vector(v), SocketType::Color) => {
                Self::color([v[0].0, v[1].0, v[2].0, 1.0])
            }
            (SocketValue::Color(c), SocketType::Float) => {
                Self::float((c[0].0 + c[1].0 + c[2].0) / 3.0)
            }
            (SocketValue::Color(c), SocketType::Vector) => Self::vector([c[0].0, c[1].0, c[2].0]),
            _ => *self,
        };
        Some(converted)
    }
}

/// Static declaration of one socket on a node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SocketDefinition {
    /// Identifier used by links, unique among the node's inputs (or outputs).
    pub identifier: String,
    /// Display name.
    pub name: String,
    pub socket_type: SocketType,
    /// Value used when an input is not linked.
    #[serde(default)]
    pub default_value: Option<SocketValue>,
    /// The operation reads this input as a single value even if an image is linked.
    #[serde(default)]
    pub expects_single_value: bool,
    /// The input may be used in its own domain without realization.
    #[serde(default)]
    pub skip_realization: bool,
    /// Lower values win when picking the operation domain.
    #[serde(default)]
    pub domain_priority: i32,
}

impl SocketDefinition {
    pub fn new(identifier: &str, name: &str, socket_type: SocketType) -> Self {
        Self {
            identifier: identifier.to_string(),
            name: name.to_string(),
            socket_type,
            default_value: None,
            expects_single_value: false,
            skip_realization: false,
            domain_priority: 0,
        }
    }

    pub fn with_default(mut self, value: SocketValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn single_value(mut self) -> Self {
        self.expects_single_value = true;
        self
    }

    pub fn skip_realization(mut self) -> Self {
        self.skip_realization = true;
        self
    }

    pub fn with_domain_priority(mut self, priority: i32) -> Self {
        self.domain_priority = priority;
        self
    }
}

/// Identifies an input socket of a specific node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InputSocket {
    pub node_id: Uuid,
    pub identifier: String,
}

impl InputSocket {
    pub fn new(node_id: Uuid, identifier: &str) -> Self {
        Self {
            node_id,
            identifier: identifier.to_string(),
        }
    }
}

impl fmt::Display for InputSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.in.{}", self.node_id, self.identifier)
    }
}

/// Identifies an output socket of a specific node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputSocket {
    pub node_id: Uuid,
    pub identifier: String,
}

impl OutputSocket {
    pub fn new(node_id: Uuid, identifier: &str) -> Self {
        Self {
            node_id,
            identifier: identifier.to_string(),
        }
    }
}

impl fmt::Display for OutputSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.out.{}", self.node_id, self.identifier)
    }
}

/// Either side of a link.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Socket {
    Input(InputSocket),
    Output(OutputSocket),
}

impl Socket {
    pub fn node_id(&self) -> Uuid {
        match self {
            Socket::Input(s) => s.node_id,
            Socket::Output(s) => s.node_id,
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Socket::Input(s) => &s.identifier,
            Socket::Output(s) => &s.identifier,
        }
    }

    pub fn as_input(&self) -> Option<&InputSocket> {
        match self {
            Socket::Input(s) => Some(s),
            Socket::Output(_) => None,
        }
    }

    pub fn as_output(&self) -> Option<&OutputSocket> {
        match self {
            Socket::Input(_) => None,
            Socket::Output(s) => Some(s),
        }
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Socket::Input(s) => s.fmt(f),
            Socket::Output(s) => s.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_converts_to_opaque_gray() {
        let value = SocketValue::float(0.25).convert_to(SocketType::Color).unwrap();
        assert_eq!(value.to_pixel(), [0.25, 0.25, 0.25, 1.0]);
    }

    #[test]
    fn test_color_converts_to_channel_average() {
        let value = SocketValue::color([0.3, 0.6, 0.9, 0.5])
            .convert_to(SocketType::Float)
            .unwrap();
        match value {
            SocketValue::Float(v) => assert!((v.0 - 0.6).abs() < 1e-6),
            other => panic!("expected a float, got {:?}", other),
        }
    }

    #[test]
    fn test_shader_has_no_value() {
        assert_eq!(SocketValue::zero(SocketType::Shader), None);
        assert_eq!(SocketValue::float(1.0).convert_to(SocketType::Shader), None);
    }

    #[test]
    fn test_socket_value_json_shape() {
        let json = serde_json::to_string(&SocketValue::float(0.5)).unwrap();
        assert_eq!(json, r#"{"type":"float","value":0.5}"#);
        let back: SocketValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SocketValue::float(0.5));
    }
}

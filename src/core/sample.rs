use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Direction of a boolean transition between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// false -> true
    Rise,
    /// true -> false
    Fall,
}

/// One channel slot of a sample.
///
/// `Null` is a regular signal meaning "no event this sample"; it is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Numeric(f64),
    Boolean(bool),
    Edge(Edge),
    Null,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<Edge> {
        match self {
            Value::Edge(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Numeric(_) => "numeric",
            Value::Boolean(_) => "boolean",
            Value::Edge(_) => "edge",
            Value::Null => "null",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Numeric(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Edge> for Value {
    fn from(e: Edge) -> Self {
        Value::Edge(e)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Null, Value::Numeric)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Edge(Edge::Rise) => write!(f, "LH"),
            Value::Edge(Edge::Fall) => write!(f, "HL"),
            Value::Null => write!(f, "-"),
        }
    }
}

/// Basic data unit passed between stages: a timestamp plus one value per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the start of the measurement.
    pub timestamp: f64,

    /// Channel values, positionally matching the stream's channel list.
    pub values: Vec<Value>,
}

impl Sample {
    pub fn new(timestamp: f64, values: Vec<Value>) -> Self {
        Self { timestamp, values }
    }

    /// Sample with every slot numeric.
    pub fn numeric(timestamp: f64, values: &[f64]) -> Self {
        Self::new(timestamp, values.iter().copied().map(Value::Numeric).collect())
    }

    /// Sample with every slot boolean.
    pub fn boolean(timestamp: f64, values: &[bool]) -> Self {
        Self::new(timestamp, values.iter().copied().map(Value::Boolean).collect())
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, channel: usize) -> Option<&Value> {
        self.values.get(channel)
    }
}

/// Ordered list of unique channel names. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelList(Arc<[String]>);

impl ChannelList {
    pub fn new<I, S>(names: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(BuildError::DuplicateChannel(name.clone()));
            }
        }
        Ok(Self(names.into()))
    }

    /// Single-channel list.
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()].into())
    }

    /// Concatenation of several lists in order; fails on a name clash.
    pub fn concat<'a>(lists: impl IntoIterator<Item = &'a ChannelList>) -> Result<Self, BuildError> {
        Self::new(lists.into_iter().flat_map(|l| l.names().iter().cloned()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }
}

//! The flattened metric record and the numeric coercion rules applied to
//! values pulled out of a stats document.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
        }
    }
}

/// One flattened gauge sample: a dotted name, a float value and the
/// concatenated ancestor tags (node, topic, channel, client — in that order).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub rate: f64,
    pub kind: MetricKind,
    pub tags: Vec<String>,
}

impl Metric {
    pub fn gauge(name: impl Into<String>, value: GaugeValue, tags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            value: value.as_f64(),
            rate: 1.0,
            kind: MetricKind::Gauge,
            tags,
        }
    }
}

/// The closed set of value shapes a gauge can be built from. Booleans map to
/// 0/1, everything else widens to `f64` (values are stats counters, small by
/// domain convention, so no overflow checking).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaugeValue {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl GaugeValue {
    pub fn as_f64(self) -> f64 {
        match self {
            GaugeValue::Bool(true) => 1.0,
            GaugeValue::Bool(false) => 0.0,
            GaugeValue::Signed(value) => value as f64,
            GaugeValue::Unsigned(value) => value as f64,
            GaugeValue::Float(value) => value,
        }
    }
}

impl From<bool> for GaugeValue {
    fn from(value: bool) -> Self {
        GaugeValue::Bool(value)
    }
}

impl From<i64> for GaugeValue {
    fn from(value: i64) -> Self {
        GaugeValue::Signed(value)
    }
}

impl From<i32> for GaugeValue {
    fn from(value: i32) -> Self {
        GaugeValue::Signed(value as i64)
    }
}

impl From<u64> for GaugeValue {
    fn from(value: u64) -> Self {
        GaugeValue::Unsigned(value)
    }
}

impl From<u32> for GaugeValue {
    fn from(value: u32) -> Self {
        GaugeValue::Unsigned(value as u64)
    }
}

impl From<usize> for GaugeValue {
    fn from(value: usize) -> Self {
        GaugeValue::Unsigned(value as u64)
    }
}

impl From<f64> for GaugeValue {
    fn from(value: f64) -> Self {
        GaugeValue::Float(value)
    }
}

/// A value in the stats document that is neither a boolean nor a number.
/// This indicates schema drift between the polled daemon and this tool, so
/// it is surfaced instead of being silently emitted as zero.
#[derive(Debug, thiserror::Error)]
#[error("unsupported gauge value shape: {found}")]
pub struct UnsupportedValue {
    pub found: String,
}

impl TryFrom<&serde_json::Value> for GaugeValue {
    type Error = UnsupportedValue;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(b) => Ok(GaugeValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(GaugeValue::Signed(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(GaugeValue::Unsigned(u))
                } else if let Some(f) = n.as_f64() {
                    Ok(GaugeValue::Float(f))
                } else {
                    Err(UnsupportedValue {
                        found: n.to_string(),
                    })
                }
            }
            other => Err(UnsupportedValue {
                found: format!("{other:?}"),
            }),
        }
    }
}

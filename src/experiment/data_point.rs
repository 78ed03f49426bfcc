//! Data points and benchmark output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One measured record produced by a benchmark invocation.
///
/// The schema is not declared up front; report columns are discovered from
/// the keys that actually show up.
pub type DataPoint = Map<String, Value>;

/// What a benchmark `run` hands back: one data point or a batch.
///
/// Batches are stored leniently: elements that are not JSON objects are
/// dropped without error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BenchmarkOutput {
    /// A single data point.
    Single(DataPoint),
    /// A sequence of candidate data points.
    Batch(Vec<Value>),
}

impl BenchmarkOutput {
    /// An output carrying no data points.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Batch(Vec::new())
    }

    /// Consume the output, keeping only well-formed data points.
    #[must_use]
    pub fn into_data_points(self) -> Vec<DataPoint> {
        match self {
            Self::Single(point) => vec![point],
            Self::Batch(values) => values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Object(point) => Some(point),
                    _ => None,
                })
                .collect(),
        }
    }
}

impl From<DataPoint> for BenchmarkOutput {
    fn from(point: DataPoint) -> Self {
        Self::Single(point)
    }
}

impl From<Vec<DataPoint>> for BenchmarkOutput {
    fn from(points: Vec<DataPoint>) -> Self {
        Self::Batch(points.into_iter().map(Value::Object).collect())
    }
}

impl From<Value> for BenchmarkOutput {
    /// Objects become a single point, arrays a batch; any other value carries
    /// no data points.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(point) => Self::Single(point),
            Value::Array(values) => Self::Batch(values),
            _ => Self::empty(),
        }
    }
}

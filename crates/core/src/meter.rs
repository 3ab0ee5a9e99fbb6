//! Stateful converters turning raw sampled values into emitted values.
//!
//! A [`DeltaMeter`] reports how far a counter moved since the previous sample, a
//! [`SnapshotMeter`] reports the latest value coerced to its declared [`ValueKind`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Meter variant chosen when a metric key is first registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterKind {
    Delta,
    Integer,
    Float,
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delta => f.write_str("delta"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
        }
    }
}

/// Type a snapshot meter coerces its samples to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Float,
}

impl From<ValueKind> for MeterKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Integer => Self::Integer,
            ValueKind::Float => Self::Float,
        }
    }
}

impl ValueKind {
    /// Coerce a raw sample, `None` when it is not representable as this kind
    pub fn coerce(self, raw: &RawValue) -> Option<MetricValue> {
        match self {
            Self::Integer => raw.as_integer().map(MetricValue::Integer),
            Self::Float => raw.as_float().map(MetricValue::Float),
        }
    }
}

/// Unconverted value supplied by a collector
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Integer view: floats truncate toward zero, text must parse as `i64`
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) => {
                let truncated = v.trunc();
                if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                    Some(truncated as i64)
                } else {
                    None
                }
            }
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Float view: NaN and infinities have no JSON number form and are rejected
    pub fn as_float(&self) -> Option<f64> {
        let value = match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        };
        value.filter(|v| v.is_finite())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for RawValue {
    // Counters past i64::MAX are kept as text so coercion reports them
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Self::Integer)
            .unwrap_or_else(|_| Self::Text(value.to_string()))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for RawValue {
    // Widen through the shortest decimal form so 3.2f32 stays 3.2
    fn from(value: f32) -> Self {
        Self::Float(value.to_string().parse().unwrap_or_else(|_| f64::from(value)))
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Converted value, serialized as a bare JSON number
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<MetricValue> for serde_json::Value {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Integer(v) => serde_json::Value::from(v),
            MetricValue::Float(v) => serde_json::Value::from(v),
        }
    }
}

/// A raw value could not be represented as the requested kind
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert {value} to {kind}")]
pub struct ConversionError {
    pub value: String,
    pub kind: MeterKind,
}

impl ConversionError {
    fn new(raw: &RawValue, kind: MeterKind) -> Self {
        Self {
            value: raw.to_string(),
            kind,
        }
    }
}

/// Emits the absolute difference between consecutive samples.
///
/// A counter that resets (reboot, wraparound) shows up as one large spike; no
/// reset detection is attempted.
#[derive(Debug, Clone)]
pub struct DeltaMeter {
    last: i64,
    last_update: DateTime<Utc>,
}

impl DeltaMeter {
    pub fn new(initial: i64) -> Self {
        Self {
            last: initial,
            last_update: Utc::now(),
        }
    }

    pub fn from_raw(raw: &RawValue) -> Result<Self, ConversionError> {
        raw.as_integer()
            .map(Self::new)
            .ok_or_else(|| ConversionError::new(raw, MeterKind::Delta))
    }

    pub fn update_and_get(&mut self, value: i64) -> i64 {
        let delta = value.abs_diff(self.last);
        self.last = value;
        self.last_update = Utc::now();
        i64::try_from(delta).unwrap_or(i64::MAX)
    }

    pub fn last(&self) -> i64 {
        self.last
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }
}

/// Emits the latest sample coerced to a fixed kind
#[derive(Debug, Clone)]
pub struct SnapshotMeter {
    kind: ValueKind,
    last: MetricValue,
    last_update: DateTime<Utc>,
}

impl SnapshotMeter {
    pub fn new(kind: ValueKind, initial: &RawValue) -> Result<Self, ConversionError> {
        let last = kind
            .coerce(initial)
            .ok_or_else(|| ConversionError::new(initial, kind.into()))?;

        Ok(Self {
            kind,
            last,
            last_update: Utc::now(),
        })
    }

    pub fn update_and_get(&mut self, raw: &RawValue) -> Result<MetricValue, ConversionError> {
        let value = self
            .kind
            .coerce(raw)
            .ok_or_else(|| ConversionError::new(raw, self.kind.into()))?;
        self.last = value;
        self.last_update = Utc::now();
        Ok(value)
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn last(&self) -> MetricValue {
        self.last
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }
}

/// A registered meter of either variant
#[derive(Debug, Clone)]
pub enum Meter {
    Delta(DeltaMeter),
    Snapshot(SnapshotMeter),
}

impl Meter {
    /// Build a meter of `kind` using `initial` as its baseline
    pub fn new(kind: MeterKind, initial: &RawValue) -> Result<Self, ConversionError> {
        match kind {
            MeterKind::Delta => DeltaMeter::from_raw(initial).map(Self::Delta),
            MeterKind::Integer => SnapshotMeter::new(ValueKind::Integer, initial).map(Self::Snapshot),
            MeterKind::Float => SnapshotMeter::new(ValueKind::Float, initial).map(Self::Snapshot),
        }
    }

    pub fn kind(&self) -> MeterKind {
        match self {
            Self::Delta(_) => MeterKind::Delta,
            Self::Snapshot(meter) => meter.kind().into(),
        }
    }

    /// Feed one raw sample and return the value to emit for this cycle.
    ///
    /// On a conversion failure the meter keeps its previous state.
    pub fn update_and_get(&mut self, raw: &RawValue) -> Result<MetricValue, ConversionError> {
        match self {
            Self::Delta(meter) => {
                let value = raw
                    .as_integer()
                    .ok_or_else(|| ConversionError::new(raw, MeterKind::Delta))?;
                Ok(MetricValue::Integer(meter.update_and_get(value)))
            }
            Self::Snapshot(meter) => meter.update_and_get(raw),
        }
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        match self {
            Self::Delta(meter) => meter.last_update(),
            Self::Snapshot(meter) => meter.last_update(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_sequence_emits_absolute_differences() {
        let samples = [100i64, 150, 150, 120, 400, 0];
        let mut meter = DeltaMeter::new(samples[0]);

        for window in samples.windows(2) {
            let emitted = meter.update_and_get(window[1]);
            assert_eq!(emitted, (window[1] - window[0]).abs());
            assert_eq!(meter.last(), window[1]);
        }
    }

    #[test]
    fn test_delta_counter_reset_spikes() {
        let mut meter = Meter::new(MeterKind::Delta, &RawValue::Integer(1_000_000)).unwrap();
        let emitted = meter.update_and_get(&RawValue::Integer(10)).unwrap();
        assert_eq!(emitted, MetricValue::Integer(999_990));
    }

    #[test]
    fn test_delta_accepts_numeric_text() {
        let mut meter = Meter::new(MeterKind::Delta, &RawValue::from("10")).unwrap();
        assert_eq!(
            meter.update_and_get(&RawValue::from(" 25 ")).unwrap(),
            MetricValue::Integer(15)
        );
    }

    #[test]
    fn test_delta_failed_update_keeps_state() {
        let mut meter = Meter::new(MeterKind::Delta, &RawValue::Integer(5)).unwrap();
        assert!(meter.update_and_get(&RawValue::from("n/a")).is_err());
        assert_eq!(
            meter.update_and_get(&RawValue::Integer(8)).unwrap(),
            MetricValue::Integer(3)
        );
    }

    #[test]
    fn test_float_snapshot_has_no_memory() {
        let mut meter = SnapshotMeter::new(ValueKind::Float, &RawValue::Float(12.5)).unwrap();

        for raw in [RawValue::Float(3.2), RawValue::Integer(7), RawValue::from("0.25")] {
            let expected = raw.as_float().unwrap();
            assert_eq!(meter.update_and_get(&raw).unwrap(), MetricValue::Float(expected));
            assert_eq!(meter.last(), MetricValue::Float(expected));
        }
    }

    #[test]
    fn test_float_snapshot_rejects_non_finite_values() {
        let mut meter = Meter::new(MeterKind::Float, &RawValue::Float(1.0)).unwrap();

        for raw in [
            RawValue::from("NaN"),
            RawValue::from("inf"),
            RawValue::from("-infinity"),
            RawValue::Float(f64::NAN),
            RawValue::Float(f64::INFINITY),
        ] {
            let err = meter.update_and_get(&raw).unwrap_err();
            assert_eq!(err.kind, MeterKind::Float);
        }

        assert_eq!(meter.update_and_get(&RawValue::from("2.5")).unwrap(), MetricValue::Float(2.5));
        assert!(Meter::new(MeterKind::Float, &RawValue::Float(f64::NEG_INFINITY)).is_err());
    }

    #[test]
    fn test_f32_widening_keeps_decimal_value() {
        assert_eq!(RawValue::from(3.2f32), RawValue::Float(3.2));
        assert_eq!(RawValue::from(0.1f32), RawValue::Float(0.1));
    }

    #[test]
    fn test_integer_snapshot_parses_text() {
        let mut meter = Meter::new(MeterKind::Integer, &RawValue::Integer(0)).unwrap();
        assert_eq!(meter.update_and_get(&RawValue::from("42")).unwrap(), MetricValue::Integer(42));

        let err = meter.update_and_get(&RawValue::from("abc")).unwrap_err();
        assert_eq!(err.kind, MeterKind::Integer);
        assert_eq!(err.value, "\"abc\"");
    }

    #[test]
    fn test_integer_snapshot_truncates_floats() {
        let mut meter = Meter::new(MeterKind::Integer, &RawValue::Integer(0)).unwrap();
        assert_eq!(meter.update_and_get(&RawValue::Float(3.9)).unwrap(), MetricValue::Integer(3));
        assert_eq!(meter.update_and_get(&RawValue::Float(-3.9)).unwrap(), MetricValue::Integer(-3));
        assert!(meter.update_and_get(&RawValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_oversized_counter_is_not_representable() {
        let raw = RawValue::from(u64::MAX);
        assert!(matches!(raw, RawValue::Text(_)));
        assert!(Meter::new(MeterKind::Integer, &raw).is_err());
        assert!(Meter::new(MeterKind::Float, &raw).is_ok());
    }

    #[test]
    fn test_meter_kind_is_reported() {
        let raw = RawValue::Integer(1);
        assert_eq!(Meter::new(MeterKind::Delta, &raw).unwrap().kind(), MeterKind::Delta);
        assert_eq!(Meter::new(MeterKind::Integer, &raw).unwrap().kind(), MeterKind::Integer);
        assert_eq!(Meter::new(MeterKind::Float, &raw).unwrap().kind(), MeterKind::Float);
    }

    #[test]
    fn test_metric_value_serializes_as_number() {
        let json = serde_json::to_string(&[MetricValue::Integer(4), MetricValue::Float(1.5)]).unwrap();
        assert_eq!(json, "[4,1.5]");
    }
}

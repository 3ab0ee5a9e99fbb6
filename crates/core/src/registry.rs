use crate::{
    error::{AgentError, Result},
    meter::{Meter, MeterKind, MetricValue, RawValue},
};
use std::collections::{hash_map::Entry, HashMap};

/// Metric key → meter mapping owned by a single reporter.
///
/// A key keeps the meter kind it was first registered with for the lifetime of
/// the registry. Keys are never evicted.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    meters: HashMap<String, Meter>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the meter for `key`, creating it with `factory` when missing
    pub fn get_or_create<F>(&mut self, key: &str, kind: MeterKind, factory: F) -> Result<&mut Meter>
    where
        F: FnOnce() -> Result<Meter>,
    {
        let mismatch = |registered: MeterKind| AgentError::MeterKindMismatch {
            key: key.to_string(),
            registered,
            requested: kind,
        };

        match self.meters.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                let meter = entry.into_mut();
                if meter.kind() != kind {
                    return Err(mismatch(meter.kind()));
                }
                Ok(meter)
            }
            Entry::Vacant(entry) => {
                let meter = factory()?;
                if meter.kind() != kind {
                    return Err(mismatch(meter.kind()));
                }
                Ok(entry.insert(meter))
            }
        }
    }

    /// Seed a meter using `initial` as its baseline. Registering an existing key
    /// with the same kind leaves its state untouched.
    pub fn register(&mut self, key: &str, kind: MeterKind, initial: &RawValue) -> Result<()> {
        self.get_or_create(key, kind, || {
            Meter::new(kind, initial).map_err(|e| AgentError::conversion(key, e))
        })?;
        Ok(())
    }

    /// Update the meter for `key` and return its emitted value.
    ///
    /// Keys seen for the first time are registered with `raw` as baseline, so
    /// a new delta meter emits zero on its first cycle.
    pub fn update(&mut self, key: &str, kind: MeterKind, raw: &RawValue) -> Result<MetricValue> {
        let meter = self.get_or_create(key, kind, || {
            tracing::debug!(key, %kind, "Registering new metric");
            Meter::new(kind, raw).map_err(|e| AgentError::conversion(key, e))
        })?;

        meter
            .update_and_get(raw)
            .map_err(|e| AgentError::conversion(key, e))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.meters.contains_key(key)
    }

    pub fn kind_of(&self, key: &str) -> Option<MeterKind> {
        self.meters.get(key).map(Meter::kind)
    }

    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::DeltaMeter;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut registry = MetricRegistry::new();
        let mut calls = 0;

        registry
            .get_or_create("eth0.bytes_sent", MeterKind::Delta, || {
                calls += 1;
                Ok(Meter::Delta(DeltaMeter::new(100)))
            })
            .unwrap();

        let meter = registry
            .get_or_create("eth0.bytes_sent", MeterKind::Delta, || {
                calls += 1;
                Ok(Meter::Delta(DeltaMeter::new(999)))
            })
            .unwrap();

        match meter {
            Meter::Delta(delta) => assert_eq!(delta.last(), 100),
            other => panic!("unexpected meter {:?}", other),
        }
        assert_eq!(calls, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_does_not_reset_state() {
        let mut registry = MetricRegistry::new();
        registry.register("sda.read_count", MeterKind::Delta, &RawValue::Integer(10)).unwrap();
        registry.update("sda.read_count", MeterKind::Delta, &RawValue::Integer(30)).unwrap();

        registry.register("sda.read_count", MeterKind::Delta, &RawValue::Integer(0)).unwrap();
        let emitted = registry.update("sda.read_count", MeterKind::Delta, &RawValue::Integer(35)).unwrap();
        assert_eq!(emitted, MetricValue::Integer(5));
    }

    #[test]
    fn test_kind_is_fixed_at_registration() {
        let mut registry = MetricRegistry::new();
        registry.register("cpu", MeterKind::Float, &RawValue::Float(1.0)).unwrap();

        let err = registry
            .update("cpu", MeterKind::Delta, &RawValue::Integer(3))
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::MeterKindMismatch { registered: MeterKind::Float, requested: MeterKind::Delta, .. }
        ));
        assert_eq!(registry.kind_of("cpu"), Some(MeterKind::Float));
    }

    #[test]
    fn test_factory_kind_must_match_request() {
        let mut registry = MetricRegistry::new();
        let result = registry.get_or_create("mem.virtual.total", MeterKind::Integer, || {
            Ok(Meter::Delta(DeltaMeter::new(0)))
        });
        assert!(result.is_err());
        assert!(!registry.contains("mem.virtual.total"));
    }

    #[test]
    fn test_unknown_key_registers_lazily_with_zero_delta() {
        let mut registry = MetricRegistry::new();
        let first = registry.update("wlan0.bytes_recv", MeterKind::Delta, &RawValue::Integer(500)).unwrap();
        assert_eq!(first, MetricValue::Integer(0));

        let second = registry.update("wlan0.bytes_recv", MeterKind::Delta, &RawValue::Integer(800)).unwrap();
        assert_eq!(second, MetricValue::Integer(300));
    }

    #[test]
    fn test_conversion_error_names_the_key() {
        let mut registry = MetricRegistry::new();
        registry.register("answer", MeterKind::Integer, &RawValue::Integer(0)).unwrap();

        assert_eq!(
            registry.update("answer", MeterKind::Integer, &RawValue::from("42")).unwrap(),
            MetricValue::Integer(42)
        );

        match registry.update("answer", MeterKind::Integer, &RawValue::from("abc")) {
            Err(AgentError::Conversion { key, source }) => {
                assert_eq!(key, "answer");
                assert_eq!(source.kind, MeterKind::Integer);
            }
            other => panic!("expected conversion error, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_registration_leaves_no_entry() {
        let mut registry = MetricRegistry::new();
        assert!(registry.register("bad", MeterKind::Float, &RawValue::from("x")).is_err());
        assert!(registry.is_empty());
    }
}

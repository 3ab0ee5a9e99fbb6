use crate::{
    error::Result,
    model::{MetricKey, RawSample},
};

/// Source of raw counters for one reporter
pub trait Collector: Send {
    /// Collector name, used in diagnostics
    fn name(&self) -> &str;

    /// Sample the host once. The returned tree defines metric keys, grouping
    /// and emission order for this cycle.
    fn collect(&mut self) -> Result<RawSample>;

    /// Metric keys to seed the registry with before the first processing pass
    fn register_keys<'a>(&self, sample: &'a RawSample) -> Vec<MetricKey<'a>> {
        sample.metric_keys()
    }
}

impl<T: Collector + ?Sized> Collector for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn collect(&mut self) -> Result<RawSample> {
        (**self).collect()
    }

    fn register_keys<'a>(&self, sample: &'a RawSample) -> Vec<MetricKey<'a>> {
        (**self).register_keys(sample)
    }
}

use crate::{
    collector::Collector,
    error::{AgentError, Result},
    model::{EmissionRecord, RawNode, RawSample, ReportMessage},
    registry::MetricRegistry,
    scheduler::Scheduler,
    sink::Sink,
};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of a completed report cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Messages accepted by the sink
    pub emitted: usize,
    /// Messages the sink failed to deliver
    pub failed: usize,
    /// Metric keys left out of this cycle because their value could not be converted
    pub skipped: Vec<String>,
}

/// Periodic collect → guard → process → emit pipeline for one collector
pub struct Reporter<C, S> {
    name: String,
    interval: Duration,
    collector: C,
    sink: S,
    registry: MetricRegistry,
    sample: Option<RawSample>,
}

impl<C: Collector, S: Sink> Reporter<C, S> {
    pub fn new<N: Into<String>>(name: N, interval: Duration, collector: C, sink: S) -> Self {
        Self {
            name: name.into(),
            interval,
            collector,
            sink,
            registry: MetricRegistry::new(),
            sample: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Take a baseline sample and seed the registry from it
    pub fn prestart(&mut self) -> Result<usize> {
        self.collect()?;
        self.register()
    }

    /// Register every metric key of the current sample, returns how many meters exist
    pub fn register(&mut self) -> Result<usize> {
        let sample = self
            .sample
            .as_ref()
            .ok_or_else(|| AgentError::collection("No sample to register metrics from"))?;

        for metric in self.collector.register_keys(sample) {
            if let Err(e) = self.registry.register(metric.key, metric.kind, metric.value) {
                if !e.is_metric_scoped() {
                    return Err(e);
                }
                warn!(reporter = %self.name, error = %e, "Cannot register metric");
            }
        }

        debug!(reporter = %self.name, meters = self.registry.len(), "Metrics registered");
        Ok(self.registry.len())
    }

    /// Replace the current sample with a fresh one, returns how long collecting took
    pub fn collect(&mut self) -> Result<Duration> {
        let start = Instant::now();
        let sample = self.collector.collect().map_err(|e| match e {
            AgentError::Collection(_) => e,
            other => AgentError::collection(format!("{}: {}", self.collector.name(), other)),
        })?;
        self.sample = Some(sample);
        Ok(start.elapsed())
    }

    /// Convert the current sample into emission records.
    ///
    /// Metrics whose value cannot be converted are left out of their record and
    /// returned in the skipped list; groups and records left with no field are dropped.
    pub fn process(&mut self) -> Result<(Vec<EmissionRecord>, Vec<String>)> {
        let sample = self
            .sample
            .as_ref()
            .ok_or_else(|| AgentError::collection("No sample collected"))?;

        let mut skipped = Vec::new();
        let mut records = Vec::with_capacity(sample.records.len());

        for raw in &sample.records {
            let record = convert_fields(&mut self.registry, &raw.fields, &mut skipped)?;
            if !record.is_empty() {
                records.push(record);
            }
        }

        Ok((records, skipped))
    }

    /// Send every record to the sink in order, returns (sent, failed)
    pub fn emit(&mut self, records: Vec<EmissionRecord>) -> (usize, usize) {
        let mut sent = 0;
        let mut failed = 0;

        for record in records {
            let message = ReportMessage::new(&self.name, record);
            match self.sink.send(&message) {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    warn!(reporter = %self.name, error = %e, "Failed to emit report");
                }
            }
        }

        (sent, failed)
    }

    /// Run one cycle, returning the first error that aborted it
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let elapsed = self.collect()?;

        // Skip the step entirely so a slow collector does not pile up late cycles
        if elapsed > self.interval {
            return Err(AgentError::Overrun {
                elapsed,
                interval: self.interval,
            });
        }

        let (records, skipped) = self.process()?;
        let (emitted, failed) = self.emit(records);

        Ok(CycleOutcome {
            emitted,
            failed,
            skipped,
        })
    }

    /// Run one cycle and log its outcome; never fails
    pub fn tick(&mut self) {
        match self.run_cycle() {
            Ok(outcome) => debug!(
                reporter = %self.name,
                emitted = outcome.emitted,
                failed = outcome.failed,
                skipped = outcome.skipped.len(),
                "Report cycle complete"
            ),
            Err(e @ AgentError::Overrun { .. }) => {
                warn!(reporter = %self.name, error = %e, "Report cycle skipped")
            }
            Err(e) => error!(reporter = %self.name, error = %e, "Report cycle failed"),
        }
    }
}

impl<C, S> Reporter<C, S>
where
    C: Collector + 'static,
    S: Sink + 'static,
{
    /// Move the reporter onto its own scheduler task, ticking every interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(mut self) -> Result<Scheduler> {
        let mut scheduler = Scheduler::new(self.name.clone(), self.interval);
        info!(reporter = %self.name, interval_secs = self.interval.as_secs(), "Starting reporter");
        scheduler.start(move || self.tick())?;
        Ok(scheduler)
    }
}

fn convert_fields(
    registry: &mut MetricRegistry,
    fields: &[(String, RawNode)],
    skipped: &mut Vec<String>,
) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (name, node) in fields {
        if let Some(value) = convert_node(registry, node, skipped)? {
            out.insert(name.clone(), value);
        }
    }
    Ok(out)
}

fn convert_node(
    registry: &mut MetricRegistry,
    node: &RawNode,
    skipped: &mut Vec<String>,
) -> Result<Option<Value>> {
    match node {
        RawNode::Metric { key, kind, value } => match registry.update(key, *kind, value) {
            Ok(v) => Ok(Some(v.into())),
            Err(e) if e.is_metric_scoped() => {
                warn!(error = %e, "Metric skipped this cycle");
                skipped.push(key.clone());
                Ok(None)
            }
            Err(e) => Err(e),
        },
        RawNode::Label(value) => Ok(Some(value.clone())),
        RawNode::Group(fields) => {
            let group = convert_fields(registry, fields, skipped)?;
            Ok((!group.is_empty()).then_some(Value::Object(group)))
        }
    }
}

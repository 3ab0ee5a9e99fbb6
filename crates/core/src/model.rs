use crate::meter::{MeterKind, RawValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node of a raw sample tree
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    /// A value routed through the meter registered under `key`
    Metric {
        key: String,
        kind: MeterKind,
        value: RawValue,
    },
    /// A value copied into the record unchanged (interface name, path, ...)
    Label(Value),
    /// A nested object
    Group(Vec<(String, RawNode)>),
}

impl RawNode {
    pub fn metric<K: Into<String>, V: Into<RawValue>>(key: K, kind: MeterKind, value: V) -> Self {
        Self::Metric {
            key: key.into(),
            kind,
            value: value.into(),
        }
    }

    pub fn label<V: Into<Value>>(value: V) -> Self {
        Self::Label(value.into())
    }

    fn visit_metrics<'a>(&'a self, out: &mut Vec<MetricKey<'a>>) {
        match self {
            Self::Metric { key, kind, value } => out.push(MetricKey {
                key,
                kind: *kind,
                value,
            }),
            Self::Label(_) => {}
            Self::Group(fields) => {
                for (_, node) in fields {
                    node.visit_metrics(out);
                }
            }
        }
    }
}

/// Raw fields that become a single emitted message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub fields: Vec<(String, RawNode)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<S: Into<String>>(mut self, name: S, node: RawNode) -> Self {
        self.fields.push((name.into(), node));
        self
    }
}

/// Everything a collector sampled during one cycle, in emission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub records: Vec<RawRecord>,
}

impl RawSample {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// All metric nodes in the sample, depth first
    pub fn metric_keys(&self) -> Vec<MetricKey<'_>> {
        let mut out = Vec::new();
        for record in &self.records {
            for (_, node) in &record.fields {
                node.visit_metrics(&mut out);
            }
        }
        out
    }
}

/// A metric key with the meter kind and value it was sampled with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricKey<'a> {
    pub key: &'a str,
    pub kind: MeterKind,
    pub value: &'a RawValue,
}

/// Converted fields of one record, in collector order
pub type EmissionRecord = Map<String, Value>;

/// Envelope handed to the sink for every emission record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMessage {
    pub m: Map<String, Value>,
    pub message: String,
}

impl ReportMessage {
    pub fn new(reporter_name: &str, record: EmissionRecord) -> Self {
        let names: Vec<&str> = record.keys().map(String::as_str).collect();
        let message = format!("Report {} metrics", names.join(" & "));

        let mut m = Map::new();
        m.insert(reporter_name.to_string(), Value::Object(record));

        Self { m, message }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Filesystem path whose usage is reported under `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredPath {
    pub name: String,
    pub path: String,
}

/// CPU sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuSample {
    pub percent: f64,
}

impl CpuSample {
    /// Usage as sysinfo reports it, rounded to one decimal
    pub fn from_usage(usage: f32) -> Self {
        Self {
            percent: round_percent(f64::from(usage)),
        }
    }
}

/// Virtual memory sample, in bytes; the platform-specific figures are `None`
/// where the host does not expose them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualMemory {
    pub total: u64,
    pub available: u64,
    pub percent: f64,
    pub used: u64,
    pub free: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<u64>,
}

/// Swap sample, in bytes; `sin`/`sout` are cumulative bytes swapped in and out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapMemory {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sin: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sout: Option<u64>,
}

/// Memory sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub virtual_memory: VirtualMemory,
    pub swap: SwapMemory,
}

/// Cumulative counters for one network interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub interface_name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropin: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropout: Option<u64>,
}

/// Cumulative I/O counters for one block device; times in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskIoCounters {
    pub disk_id: String,
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_time: u64,
    pub write_time: u64,
}

/// Filesystem usage of a monitored path, in bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathUsage {
    pub name: String,
    pub path: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// Everything the system collector read from the host in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    pub cpu: CpuSample,
    pub memory: MemorySample,
    pub networks: Vec<NetworkCounters>,
    pub disks: Vec<DiskIoCounters>,
    pub paths: Vec<PathUsage>,
}

/// `used / total` as a percentage rounded to one decimal, 0 when `total` is 0
pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_percent(used as f64 / total as f64 * 100.0)
}

/// Round a percentage to one decimal
pub fn round_percent(percent: f64) -> f64 {
    (percent * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_message_envelope() {
        let mut record = EmissionRecord::new();
        record.insert("cpu".to_string(), json!(3.2));
        record.insert("mem".to_string(), json!({"virtual": {"total": 8}}));

        let message = ReportMessage::new("monitoring-agent", record);
        assert_eq!(message.message, "Report cpu & mem metrics");

        let value: Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "m": {"monitoring-agent": {"cpu": 3.2, "mem": {"virtual": {"total": 8}}}},
                "message": "Report cpu & mem metrics"
            })
        );
    }

    #[test]
    fn test_metric_keys_walk_nested_groups() {
        let record = RawRecord::new()
            .field("cpu", RawNode::metric("cpu", MeterKind::Float, 1.0))
            .field(
                "mem",
                RawNode::Group(vec![(
                    "swap".to_string(),
                    RawNode::Group(vec![
                        ("total".to_string(), RawNode::metric("mem.swap.total", MeterKind::Integer, 4u64)),
                        ("name".to_string(), RawNode::label("swap")),
                    ]),
                )]),
            );
        let sample = RawSample::new(vec![record]);

        let keys: Vec<&str> = sample.metric_keys().iter().map(|k| k.key).collect();
        assert_eq!(keys, vec!["cpu", "mem.swap.total"]);
    }

    #[test]
    fn test_usage_percent() {
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(1, 3), 33.3);
        assert_eq!(usage_percent(50, 100), 50.0);
    }

    #[test]
    fn test_cpu_usage_keeps_one_decimal() {
        assert_eq!(CpuSample::from_usage(3.2).percent, 3.2);
        assert_eq!(CpuSample::from_usage(99.96).percent, 100.0);
        assert_eq!(serde_json::to_string(&CpuSample::from_usage(12.3)).unwrap(), r#"{"percent":12.3}"#);
    }
}

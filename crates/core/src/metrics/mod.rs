pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use memory::MemoryCollector;
pub use network::NetworkCollector;

use crate::{
    collector::Collector,
    error::Result,
    meter::MeterKind,
    model::{MonitoredPath, RawNode, RawRecord, RawSample, SystemSample},
    platform::{get_platform_provider, PlatformProvider},
};

/// Host resource collector: cpu, memory, block device I/O, monitored path
/// usage and network interfaces
pub struct SystemCollector {
    provider: Box<dyn PlatformProvider>,
    cpu: CpuCollector,
    memory: MemoryCollector,
    network: NetworkCollector,
    disk: DiskCollector,
}

impl SystemCollector {
    pub fn new(paths: Vec<MonitoredPath>) -> Result<Self> {
        Self::with_provider(paths, get_platform_provider())
    }

    pub fn with_provider(paths: Vec<MonitoredPath>, provider: Box<dyn PlatformProvider>) -> Result<Self> {
        Ok(Self {
            provider,
            cpu: CpuCollector::new()?,
            memory: MemoryCollector::new()?,
            network: NetworkCollector::new()?,
            disk: DiskCollector::new(paths)?,
        })
    }

    pub fn platform_name(&self) -> &'static str {
        self.provider.platform_name()
    }

    /// Read every counter from the host
    pub fn sample(&mut self) -> Result<SystemSample> {
        let details = self.provider.memory_details()?;
        let drops = self.provider.interface_drops()?;

        Ok(SystemSample {
            cpu: self.cpu.collect()?,
            memory: self.memory.collect(&details)?,
            networks: self.network.collect(&drops)?,
            disks: self.provider.disk_io_counters()?,
            paths: self.disk.collect()?,
        })
    }
}

impl Collector for SystemCollector {
    fn name(&self) -> &str {
        "system"
    }

    fn collect(&mut self) -> Result<RawSample> {
        let sample = self.sample()?;
        Ok(build_raw_sample(&sample))
    }
}

/// Lay a host sample out as report records: the cpu and memory record first,
/// then one record per disk, per monitored path and per network interface.
pub fn build_raw_sample(sample: &SystemSample) -> RawSample {
    let mut records = Vec::with_capacity(1 + sample.disks.len() + sample.paths.len() + sample.networks.len());

    let vm = &sample.memory.virtual_memory;
    let swap = &sample.memory.swap;
    let mut virtual_fields = vec![
        integer("total", "mem.virtual.total", vm.total),
        integer("available", "mem.virtual.available", vm.available),
        float("percent", "mem.virtual.percent", vm.percent),
        integer("used", "mem.virtual.used", vm.used),
        integer("free", "mem.virtual.free", vm.free),
    ];
    virtual_fields.extend(
        [
            optional_integer("active", "mem.virtual.active", vm.active),
            optional_integer("inactive", "mem.virtual.inactive", vm.inactive),
            optional_integer("buffers", "mem.virtual.buffers", vm.buffers),
            optional_integer("cached", "mem.virtual.cached", vm.cached),
        ]
        .into_iter()
        .flatten(),
    );

    let mut swap_fields = vec![
        integer("total", "mem.swap.total", swap.total),
        integer("used", "mem.swap.used", swap.used),
        integer("free", "mem.swap.free", swap.free),
        float("percent", "mem.swap.percent", swap.percent),
    ];
    swap_fields.extend(
        [
            optional_integer("sin", "mem.swap.sin", swap.sin),
            optional_integer("sout", "mem.swap.sout", swap.sout),
        ]
        .into_iter()
        .flatten(),
    );

    let memory = group(vec![
        ("virtual".to_string(), group(virtual_fields)),
        ("swap".to_string(), group(swap_fields)),
    ]);

    records.push(
        RawRecord::new()
            .field("cpu", RawNode::metric("cpu", MeterKind::Float, sample.cpu.percent))
            .field("mem", memory),
    );

    for disk in &sample.disks {
        let id = &disk.disk_id;
        records.push(RawRecord::new().field(
            "io_disk",
            group(vec![
                ("disk_id".to_string(), RawNode::label(id.as_str())),
                delta("read_count", id, disk.read_count),
                delta("write_count", id, disk.write_count),
                delta("read_bytes", id, disk.read_bytes),
                delta("write_bytes", id, disk.write_bytes),
                delta("read_time", id, disk.read_time),
                delta("write_time", id, disk.write_time),
            ]),
        ));
    }

    for path in &sample.paths {
        let name = &path.name;
        records.push(RawRecord::new().field(
            "disk",
            group(vec![
                ("name".to_string(), RawNode::label(name.as_str())),
                ("path".to_string(), RawNode::label(path.path.as_str())),
                integer("total", &format!("{}.total", name), path.total),
                integer("used", &format!("{}.used", name), path.used),
                integer("free", &format!("{}.free", name), path.free),
                float("percent", &format!("{}.percent", name), path.percent),
            ]),
        ));
    }

    for net in &sample.networks {
        let name = &net.interface_name;
        let mut fields = vec![
            ("name".to_string(), RawNode::label(name.as_str())),
            delta("bytes_sent", name, net.bytes_sent),
            delta("bytes_recv", name, net.bytes_recv),
            delta("packets_sent", name, net.packets_sent),
            delta("packets_recv", name, net.packets_recv),
            delta("errin", name, net.errin),
            delta("errout", name, net.errout),
        ];
        fields.extend(net.dropin.map(|value| delta("dropin", name, value)));
        fields.extend(net.dropout.map(|value| delta("dropout", name, value)));

        records.push(RawRecord::new().field("network", group(fields)));
    }

    RawSample::new(records)
}

fn group(fields: Vec<(String, RawNode)>) -> RawNode {
    RawNode::Group(fields)
}

fn integer(field: &str, key: &str, value: u64) -> (String, RawNode) {
    (field.to_string(), RawNode::metric(key, MeterKind::Integer, value))
}

fn optional_integer(field: &str, key: &str, value: Option<u64>) -> Option<(String, RawNode)> {
    value.map(|value| integer(field, key, value))
}

fn float(field: &str, key: &str, value: f64) -> (String, RawNode) {
    (field.to_string(), RawNode::metric(key, MeterKind::Float, value))
}

/// Counter field keyed as `<owner>.<field>`
fn delta(field: &str, owner: &str, value: u64) -> (String, RawNode) {
    (
        field.to_string(),
        RawNode::metric(format!("{}.{}", owner, field), MeterKind::Delta, value),
    )
}

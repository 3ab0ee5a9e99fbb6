use super::{InterfaceDrops, MemoryDetails, PlatformProvider};
use crate::{error::Result, model::DiskIoCounters};
use std::collections::HashMap;

pub struct WindowsProvider;

impl WindowsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformProvider for WindowsProvider {
    fn disk_io_counters(&self) -> Result<Vec<DiskIoCounters>> {
        // Would need the PhysicalDisk performance counters (PDH)
        Ok(Vec::new())
    }

    fn interface_drops(&self) -> Result<HashMap<String, InterfaceDrops>> {
        Ok(HashMap::new())
    }

    fn memory_details(&self) -> Result<MemoryDetails> {
        Ok(MemoryDetails::default())
    }

    fn platform_name(&self) -> &'static str {
        "windows"
    }
}

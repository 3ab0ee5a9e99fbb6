use super::{InterfaceDrops, MemoryDetails, PlatformProvider};
use crate::{error::Result, model::DiskIoCounters};
use std::collections::HashMap;

pub struct MacosProvider;

impl MacosProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformProvider for MacosProvider {
    fn disk_io_counters(&self) -> Result<Vec<DiskIoCounters>> {
        // Per-disk statistics live in IOKit (IOBlockStorageDriver), not read yet
        Ok(Vec::new())
    }

    fn interface_drops(&self) -> Result<HashMap<String, InterfaceDrops>> {
        Ok(HashMap::new())
    }

    fn memory_details(&self) -> Result<MemoryDetails> {
        Ok(MemoryDetails::default())
    }

    fn platform_name(&self) -> &'static str {
        "macos"
    }
}

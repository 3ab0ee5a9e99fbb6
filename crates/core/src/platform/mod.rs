#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "windows")]
pub mod windows;

use crate::{error::Result, model::DiskIoCounters};
use std::collections::HashMap;

/// Host counters `sysinfo` does not expose on every platform
pub trait PlatformProvider: Send {
    /// Cumulative I/O counters for every block device
    fn disk_io_counters(&self) -> Result<Vec<DiskIoCounters>>;

    /// Dropped packet counters keyed by interface name; interfaces missing
    /// from the map report no drop fields
    fn interface_drops(&self) -> Result<HashMap<String, InterfaceDrops>>;

    /// Memory figures beyond total/used/free; figures left `None` are not reported
    fn memory_details(&self) -> Result<MemoryDetails>;

    /// Get platform name
    fn platform_name(&self) -> &'static str;
}

/// Dropped packets of one interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceDrops {
    pub dropin: u64,
    pub dropout: u64,
}

/// Platform-specific memory figures, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryDetails {
    pub active: Option<u64>,
    pub inactive: Option<u64>,
    pub buffers: Option<u64>,
    pub cached: Option<u64>,
    pub swap_in: Option<u64>,
    pub swap_out: Option<u64>,
}

/// Get the appropriate platform provider for the current system
pub fn get_platform_provider() -> Box<dyn PlatformProvider> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxProvider::new())
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacosProvider::new())
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsProvider::new())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Box::new(GenericProvider::new())
    }
}

/// Generic provider for unsupported platforms
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub struct GenericProvider;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
impl GenericProvider {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
impl PlatformProvider for GenericProvider {
    fn disk_io_counters(&self) -> Result<Vec<DiskIoCounters>> {
        Ok(Vec::new())
    }

    fn interface_drops(&self) -> Result<HashMap<String, InterfaceDrops>> {
        Ok(HashMap::new())
    }

    fn memory_details(&self) -> Result<MemoryDetails> {
        Ok(MemoryDetails::default())
    }

    fn platform_name(&self) -> &'static str {
        "generic"
    }
}

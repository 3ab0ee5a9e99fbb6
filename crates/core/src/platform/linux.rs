use super::{InterfaceDrops, MemoryDetails, PlatformProvider};
use crate::{error::Result, model::DiskIoCounters};
use std::collections::HashMap;

/// Bytes per sector as reported by /proc/diskstats, independent of the device
#[cfg(feature = "linux_procfs")]
const SECTOR_SIZE: u64 = 512;

pub struct LinuxProvider;

impl LinuxProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformProvider for LinuxProvider {
    fn disk_io_counters(&self) -> Result<Vec<DiskIoCounters>> {
        #[cfg(feature = "linux_procfs")]
        {
            self.disk_io_counters_procfs()
        }

        #[cfg(not(feature = "linux_procfs"))]
        {
            Ok(Vec::new())
        }
    }

    fn interface_drops(&self) -> Result<HashMap<String, InterfaceDrops>> {
        #[cfg(feature = "linux_procfs")]
        {
            self.interface_drops_procfs()
        }

        #[cfg(not(feature = "linux_procfs"))]
        {
            Ok(HashMap::new())
        }
    }

    fn memory_details(&self) -> Result<MemoryDetails> {
        #[cfg(feature = "linux_procfs")]
        {
            self.memory_details_procfs()
        }

        #[cfg(not(feature = "linux_procfs"))]
        {
            Ok(MemoryDetails::default())
        }
    }

    fn platform_name(&self) -> &'static str {
        "linux"
    }
}

#[cfg(feature = "linux_procfs")]
impl LinuxProvider {
    fn disk_io_counters_procfs(&self) -> Result<Vec<DiskIoCounters>> {
        let mut disks: Vec<DiskIoCounters> = procfs::diskstats()?
            .into_iter()
            .filter(|stat| !is_virtual_device(&stat.name))
            .map(|stat| DiskIoCounters {
                disk_id: stat.name,
                read_count: stat.reads as u64,
                write_count: stat.writes as u64,
                read_bytes: stat.sectors_read as u64 * SECTOR_SIZE,
                write_bytes: stat.sectors_written as u64 * SECTOR_SIZE,
                read_time: stat.time_reading as u64,
                write_time: stat.time_writing as u64,
            })
            .collect();

        disks.sort_by(|a, b| a.disk_id.cmp(&b.disk_id));
        Ok(disks)
    }

    fn interface_drops_procfs(&self) -> Result<HashMap<String, InterfaceDrops>> {
        let devices = procfs::net::dev_status()?;

        Ok(devices
            .into_iter()
            .map(|(name, status)| {
                (
                    name,
                    InterfaceDrops {
                        dropin: status.recv_drop,
                        dropout: status.sent_drop,
                    },
                )
            })
            .collect())
    }

    fn memory_details_procfs(&self) -> Result<MemoryDetails> {
        use procfs::Current;

        let meminfo = procfs::Meminfo::current()?;

        // pswpin/pswpout count pages since boot
        let page_size = procfs::page_size();
        let vmstat = procfs::vmstat()?;
        let swapped = |name: &str| vmstat.get(name).map(|pages| (*pages).max(0) as u64 * page_size);

        Ok(MemoryDetails {
            active: Some(meminfo.active),
            inactive: Some(meminfo.inactive),
            buffers: Some(meminfo.buffers),
            cached: Some(meminfo.cached),
            swap_in: swapped("pswpin"),
            swap_out: swapped("pswpout"),
        })
    }
}

/// Loop and ram disks carry no physical I/O worth reporting
#[cfg_attr(not(feature = "linux_procfs"), allow(dead_code))]
fn is_virtual_device(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_devices_are_filtered() {
        assert!(is_virtual_device("loop0"));
        assert!(is_virtual_device("ram12"));
        assert!(!is_virtual_device("sda"));
        assert!(!is_virtual_device("nvme0n1"));
    }

    #[test]
    fn test_linux_counters_can_be_read() {
        let provider = LinuxProvider::new();
        assert_eq!(provider.platform_name(), "linux");
        assert!(provider.disk_io_counters().is_ok());
        assert!(provider.interface_drops().is_ok());
    }

    #[cfg(feature = "linux_procfs")]
    #[test]
    fn test_disk_counters_match_diskstats() {
        let physical: Vec<String> = std::fs::read_to_string("/proc/diskstats")
            .unwrap()
            .lines()
            .filter_map(|line| line.split_whitespace().nth(2).map(str::to_string))
            .filter(|name| !is_virtual_device(name))
            .collect();

        let disks = LinuxProvider::new().disk_io_counters().unwrap();
        assert_eq!(disks.len(), physical.len());
        assert!(disks.iter().all(|disk| physical.contains(&disk.disk_id)));
        assert!(disks.windows(2).all(|pair| pair[0].disk_id <= pair[1].disk_id));
    }

    #[cfg(feature = "linux_procfs")]
    #[test]
    fn test_memory_details_are_reported() {
        let details = LinuxProvider::new().memory_details().unwrap();
        assert!(details.active.is_some());
        assert!(details.inactive.is_some());
        assert!(details.buffers.is_some());
        assert!(details.cached.is_some());
    }
}

use crate::{
    error::Result,
    model::{usage_percent, MemorySample, SwapMemory, VirtualMemory},
    platform::MemoryDetails,
};
use sysinfo::System;

pub struct MemoryCollector {
    sys: System,
}

impl MemoryCollector {
    pub fn new() -> Result<Self> {
        let sys = System::new();

        Ok(Self { sys })
    }

    /// Read memory and swap usage; `details` fills what sysinfo cannot provide
    pub fn collect(&mut self, details: &MemoryDetails) -> Result<MemorySample> {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        let available = self.sys.available_memory();

        let virtual_memory = VirtualMemory {
            total,
            available,
            percent: usage_percent(total.saturating_sub(available), total),
            used: self.sys.used_memory(),
            free: self.sys.free_memory(),
            active: details.active,
            inactive: details.inactive,
            buffers: details.buffers,
            cached: details.cached,
        };

        let swap_total = self.sys.total_swap();
        let swap_used = self.sys.used_swap();

        let swap = SwapMemory {
            total: swap_total,
            used: swap_used,
            free: self.sys.free_swap(),
            percent: usage_percent(swap_used, swap_total),
            sin: details.swap_in,
            sout: details.swap_out,
        };

        Ok(MemorySample {
            virtual_memory,
            swap,
        })
    }
}

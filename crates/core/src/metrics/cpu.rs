use crate::{error::Result, model::CpuSample};
use sysinfo::System;

pub struct CpuCollector {
    sys: System,
}

impl CpuCollector {
    pub fn new() -> Result<Self> {
        let mut sys = System::new();
        // Usage is computed between two refreshes, take the baseline now
        sys.refresh_cpu();

        Ok(Self { sys })
    }

    /// Overall CPU usage since the previous call
    pub fn collect(&mut self) -> Result<CpuSample> {
        self.sys.refresh_cpu();

        Ok(CpuSample::from_usage(self.sys.global_cpu_info().cpu_usage()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_percent_is_bounded() {
        let mut collector = CpuCollector::new().unwrap();
        let sample = collector.collect().unwrap();
        assert!(sample.percent >= 0.0);
        assert!(sample.percent <= 100.0);
        assert_eq!(sample.percent, (sample.percent * 10.0).round() / 10.0);
    }
}

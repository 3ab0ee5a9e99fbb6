use crate::{
    error::Result,
    model::{usage_percent, MonitoredPath, PathUsage},
};

/// Filesystem usage of the configured paths
pub struct DiskCollector {
    paths: Vec<MonitoredPath>,
    #[cfg(not(unix))]
    disks: sysinfo::Disks,
}

impl DiskCollector {
    pub fn new(paths: Vec<MonitoredPath>) -> Result<Self> {
        Ok(Self {
            paths,
            #[cfg(not(unix))]
            disks: sysinfo::Disks::new_with_refreshed_list(),
        })
    }

    /// Usage of every monitored path, in configuration order
    pub fn collect(&mut self) -> Result<Vec<PathUsage>> {
        #[cfg(not(unix))]
        self.disks.refresh_list();

        let mut usages = Vec::with_capacity(self.paths.len());
        for monitored in &self.paths {
            let (total, used, free) = self.usage(&monitored.path)?;
            usages.push(PathUsage {
                name: monitored.name.clone(),
                path: monitored.path.clone(),
                total,
                used,
                free,
                // Relative to the space available to unprivileged users
                percent: usage_percent(used, used + free),
            });
        }

        Ok(usages)
    }

    /// (total, used, free) bytes of the filesystem holding `path`
    #[cfg(unix)]
    fn usage(&self, path: &str) -> Result<(u64, u64, u64)> {
        let stat = nix::sys::statvfs::statvfs(std::path::Path::new(path))?;

        let fragment_size = stat.fragment_size() as u64;
        let total = stat.blocks() as u64 * fragment_size;
        let free = stat.blocks_available() as u64 * fragment_size;
        let used = (stat.blocks() as u64).saturating_sub(stat.blocks_free() as u64) * fragment_size;

        Ok((total, used, free))
    }

    /// (total, used, free) bytes of the disk mounted closest to `path`
    #[cfg(not(unix))]
    fn usage(&self, path: &str) -> Result<(u64, u64, u64)> {
        let path = std::path::Path::new(path);
        let disk = self
            .disks
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| {
                crate::error::AgentError::platform(format!("No disk mounted for {}", path.display()))
            })?;

        let total = disk.total_space();
        let free = disk.available_space();
        Ok((total, total.saturating_sub(free), free))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_configuration_order() {
        let root = std::env::temp_dir().to_string_lossy().to_string();
        let mut collector = DiskCollector::new(vec![
            MonitoredPath::new("tmp", root.clone()),
            MonitoredPath::new("also_tmp", root),
        ])
        .unwrap();

        let usages = collector.collect().unwrap();
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].name, "tmp");
        assert_eq!(usages[1].name, "also_tmp");
        assert!(usages[0].total > 0);
        assert!(usages[0].used <= usages[0].total);
        assert!((0.0..=100.0).contains(&usages[0].percent));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_path_is_an_error() {
        let mut collector =
            DiskCollector::new(vec![MonitoredPath::new("gone", "/definitely/not/here")]).unwrap();
        assert!(collector.collect().is_err());
    }
}

use crate::{
    error::{AgentError, Result},
    model::MonitoredPath,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::PathBuf, time::Duration};
use tracing::warn;

const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_REPORTER_NAME: &str = "monitoring-agent";
const DEFAULT_SYSLOG_PORT: u16 = 514;
const MAX_INTERVAL_SECS: u64 = 86_400;

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between two report cycles
    pub interval_secs: u64,

    /// Name the reports are published under
    pub reporter_name: String,

    /// Remote syslog receiver; reports go to the local log when absent
    pub syslog: Option<SyslogConfig>,

    /// Filesystem paths whose usage is reported
    pub paths: Vec<MonitoredPath>,
}

/// Remote syslog receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyslogConfig {
    pub host: String,

    #[serde(default = "default_syslog_port")]
    pub port: u16,
}

fn default_syslog_port() -> u16 {
    DEFAULT_SYSLOG_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            reporter_name: DEFAULT_REPORTER_NAME.to_string(),
            syslog: None,
            paths: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in order of preference:
    /// 1. CLI arguments override everything
    /// 2. JSON config file if specified
    /// 3. Default config file locations
    /// 4. Built-in defaults
    pub fn load(cli_config: Option<&CliConfig>, json_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(default_layer) = Self::load_default_config()? {
            config.merge(default_layer);
        }

        if let Some(path) = json_path {
            config.merge(ConfigLayer::read(path)?);
        }

        if let Some(cli) = cli_config {
            config.apply_cli_overrides(cli)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific JSON file, over the built-in defaults
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let mut config = Self::default();
        config.merge(ConfigLayer::read(path)?);
        Ok(config)
    }

    fn load_default_config() -> Result<Option<ConfigLayer>> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match ConfigLayer::read(&path) {
                    Ok(layer) => return Ok(Some(layer)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Ignoring config file");
                        continue;
                    }
                }
            }
        }

        Ok(None)
    }

    /// Get default configuration file search paths
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("perfstats").join("config.json"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".perfstats.json"));
        }

        paths.push(PathBuf::from("perfstats.json"));

        paths
    }

    /// Apply every key the layer sets, whatever its value
    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(interval) = layer.interval_secs {
            self.interval_secs = interval;
        }
        if let Some(name) = layer.reporter_name {
            self.reporter_name = name;
        }
        if let Some(syslog) = layer.syslog {
            self.syslog = Some(syslog);
        }
        if let Some(paths) = layer.paths {
            self.paths = paths;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &CliConfig) -> Result<()> {
        if let Some(interval) = cli.interval_secs {
            self.interval_secs = interval;
        }
        if let Some(name) = &cli.reporter_name {
            self.reporter_name = name.clone();
        }
        if let Some(host) = &cli.syslog_host {
            let port = self.syslog.as_ref().map_or(DEFAULT_SYSLOG_PORT, |s| s.port);
            self.syslog = Some(SyslogConfig {
                host: host.clone(),
                port,
            });
        }
        if let Some(port) = cli.syslog_port {
            match self.syslog.as_mut() {
                Some(syslog) => syslog.port = port,
                None => return Err(AgentError::config("A syslog port was given without a syslog host")),
            }
        }
        if let Some(paths) = &cli.paths {
            self.paths = paths.clone();
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(AgentError::config("Interval must be at least 1 second"));
        }

        if self.interval_secs > MAX_INTERVAL_SECS {
            return Err(AgentError::config("Interval must be at most one day"));
        }

        if self.reporter_name.trim().is_empty() {
            return Err(AgentError::config("Reporter name must not be empty"));
        }

        if let Some(syslog) = &self.syslog {
            if syslog.host.trim().is_empty() {
                return Err(AgentError::config("Syslog host must not be empty"));
            }
            if syslog.port == 0 {
                return Err(AgentError::config("Syslog port must not be 0"));
            }
        }

        let mut names = HashSet::new();
        for path in &self.paths {
            if path.name.is_empty() || path.path.is_empty() {
                return Err(AgentError::config("Monitored paths need both a name and a path"));
            }
            // Path names prefix metric keys
            if path.name.contains('.') {
                return Err(AgentError::config(format!(
                    "Path name {} must not contain '.'",
                    path.name
                )));
            }
            if !names.insert(path.name.as_str()) {
                return Err(AgentError::config(format!("Duplicate path name {}", path.name)));
            }
        }

        Ok(())
    }

    /// Get the report interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl MonitoredPath {
    pub fn new<N: Into<String>, P: Into<String>>(name: N, path: P) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parse a `name:path,name:path` list
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, path) = entry.split_once(':').ok_or_else(|| {
                    AgentError::config(format!("Invalid path entry {}, expected name:path", entry))
                })?;
                let (name, path) = (name.trim(), path.trim());
                if name.is_empty() || path.is_empty() {
                    return Err(AgentError::config(format!(
                        "Invalid path entry {}, expected name:path",
                        entry
                    )));
                }
                Ok(Self::new(name, path))
            })
            .collect()
    }
}

/// Keys present in one JSON configuration file
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigLayer {
    interval_secs: Option<u64>,
    reporter_name: Option<String>,
    syslog: Option<SyslogConfig>,
    paths: Option<Vec<MonitoredPath>>,
}

impl ConfigLayer {
    fn read(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AgentError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            AgentError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }
}

/// CLI configuration (temporary struct for CLI parsing)
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub interval_secs: Option<u64>,
    pub reporter_name: Option<String>,
    pub syslog_host: Option<String>,
    pub syslog_port: Option<u16>,
    pub paths: Option<Vec<MonitoredPath>>,
}

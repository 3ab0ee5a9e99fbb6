use clap::{Arg, Command};
use perfstats_core::{config::CliConfig, Config, MonitoredPath, Reporter, Sink, SystemCollector};
use perfstats_transport::{SyslogSink, TracingSink};
use std::{path::PathBuf, process};
use sysinfo::System;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?)
        .init();

    let matches = Command::new("perfstats")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Periodic host metrics agent - samples system counters and reports them to syslog")
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("SECS")
                .help("Seconds between two reports")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .value_name("NAME")
                .help("Name the reports are published under"),
        )
        .arg(
            Arg::new("syslog-host")
                .long("syslog-host")
                .value_name("HOST")
                .help("Remote syslog receiver; reports are logged locally when omitted"),
        )
        .arg(
            Arg::new("syslog-port")
                .long("syslog-port")
                .value_name("PORT")
                .help("Remote syslog port")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("paths")
                .long("paths")
                .value_name("NAME:PATH,...")
                .help("Filesystem paths whose usage is reported"),
        )
        .arg(
            Arg::new("json-config")
                .long("json-config")
                .value_name("PATH")
                .help("Path to JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches();

    let paths = matches
        .get_one::<String>("paths")
        .map(|list| MonitoredPath::parse_list(list))
        .transpose()?;

    let cli_config = CliConfig {
        interval_secs: matches.get_one::<u64>("interval").copied(),
        reporter_name: matches.get_one::<String>("name").cloned(),
        syslog_host: matches.get_one::<String>("syslog-host").cloned(),
        syslog_port: matches.get_one::<u16>("syslog-port").copied(),
        paths,
    };

    let json_config_path = matches.get_one::<PathBuf>("json-config");
    let config = Config::load(Some(&cli_config), json_config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_agent(config))
}

/// Start every reporter and keep them running until Ctrl-C
async fn run_agent(config: Config) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting the monitoring agent");

    // Stamped on every syslog line
    let hostname = System::host_name().unwrap_or_else(|| "localhost".to_string());

    let sink: Box<dyn Sink> = match &config.syslog {
        Some(syslog) => {
            info!(host = %syslog.host, port = syslog.port, %hostname, "Reporting to syslog");
            Box::new(SyslogSink::connect(
                &syslog.host,
                syslog.port,
                hostname,
                config.reporter_name.as_str(),
            )?)
        }
        None => {
            info!("No syslog receiver configured, reporting to the local log");
            Box::new(TracingSink::new())
        }
    };

    let collector = SystemCollector::new(config.paths.clone())?;
    info!(
        platform = collector.platform_name(),
        paths = config.paths.len(),
        "System collector ready"
    );

    let mut reporter = Reporter::new(config.reporter_name.as_str(), config.interval(), collector, sink);
    let meters = reporter.prestart()?;
    info!(reporter = reporter.name(), meters, "Baseline collected");

    let mut schedulers = vec![reporter.spawn()?];

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    for scheduler in &schedulers {
        scheduler.stop();
    }
    for scheduler in schedulers.iter_mut() {
        scheduler.join().await?;
    }

    Ok(())
}

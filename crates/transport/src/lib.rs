//! Report sinks for the perfstats agent.
//!
//! [`TracingSink`] writes reports to the local log, [`SyslogSink`] ships them
//! to a remote syslog receiver over UDP.

pub mod log;
pub mod syslog;

pub use log::TracingSink;
pub use syslog::SyslogSink;

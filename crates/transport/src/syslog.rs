use chrono::{DateTime, Local};
use perfstats_core::{AgentError, ReportMessage, Result, Sink};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::debug;

/// Reports are filed under the user facility at informational severity
const FACILITY_USER: u8 = 1;
const SEVERITY_INFO: u8 = 6;

/// Sends each report as one BSD syslog datagram:
/// `<PRI>Mmm dd hh:mm:ss <hostname> <app>: <json>`
pub struct SyslogSink {
    socket: UdpSocket,
    target: SocketAddr,
    hostname: String,
    app_name: String,
}

impl SyslogSink {
    /// Resolve the receiver once and bind a local socket for it.
    ///
    /// `hostname` is stamped on every message as is.
    pub fn connect<H, A>(host: &str, port: u16, hostname: H, app_name: A) -> Result<Self>
    where
        H: Into<String>,
        A: Into<String>,
    {
        let target = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| AgentError::config(format!("Cannot resolve syslog host {}", host)))?;

        let bind_addr = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind_addr)?;
        debug!(%target, "Syslog sink ready");

        Ok(Self {
            socket,
            target,
            hostname: hostname.into(),
            app_name: app_name.into(),
        })
    }

    /// Render one datagram, NUL terminated
    pub fn format(&self, body: &str, timestamp: DateTime<Local>) -> String {
        let priority = FACILITY_USER * 8 + SEVERITY_INFO;
        format!(
            "<{}>{} {} {}: {}\0",
            priority,
            timestamp.format("%b %d %H:%M:%S"),
            self.hostname,
            self.app_name,
            body
        )
    }
}

impl Sink for SyslogSink {
    fn send(&mut self, message: &ReportMessage) -> Result<()> {
        let body = message
            .to_json()
            .map_err(|e| AgentError::emission(format!("Cannot serialize report: {}", e)))?;
        let datagram = self.format(&body, Local::now());

        self.socket
            .send_to(datagram.as_bytes(), self.target)
            .map_err(|e| AgentError::emission(format!("Cannot send to {}: {}", self.target, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use perfstats_core::EmissionRecord;
    use std::time::Duration;

    fn receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        socket
    }

    #[test]
    fn test_datagram_format() {
        let server = receiver();
        let port = server.local_addr().unwrap().port();
        let sink = SyslogSink::connect("127.0.0.1", port, "web-1", "monitoring-agent").unwrap();
        let timestamp = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();

        assert_eq!(
            sink.format("{}", timestamp),
            "<14>Mar 05 07:08:09 web-1 monitoring-agent: {}\0"
        );
    }

    #[test]
    fn test_send_delivers_one_datagram_per_report() {
        let server = receiver();
        let port = server.local_addr().unwrap().port();
        let mut sink = SyslogSink::connect("127.0.0.1", port, "web-1", "monitoring-agent").unwrap();

        let mut record = EmissionRecord::new();
        record.insert("cpu".to_string(), serde_json::json!(3.2));
        sink.send(&ReportMessage::new("monitoring-agent", record)).unwrap();

        let mut buf = [0u8; 2048];
        let len = server.recv(&mut buf).unwrap();
        let datagram = std::str::from_utf8(&buf[..len]).unwrap();

        assert!(datagram.starts_with("<14>"));
        assert!(datagram.ends_with('\0'));

        let body = datagram
            .trim_end_matches('\0')
            .split_once("monitoring-agent: ")
            .map(|(_, body)| body)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["message"], "Report cpu metrics");
        assert_eq!(json["m"]["monitoring-agent"]["cpu"], 3.2);
    }

    #[test]
    fn test_unresolvable_host_fails() {
        assert!(SyslogSink::connect("host.invalid.", 514, "web-1", "agent").is_err());
    }
}

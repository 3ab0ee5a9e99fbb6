use perfstats_core::{AgentError, ReportMessage, Result, Sink};

/// Target the reports are logged under, so they can be filtered apart from diagnostics
pub const REPORT_TARGET: &str = "perfstats::report";

/// Writes every report as one info line on the [`REPORT_TARGET`] target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for TracingSink {
    fn send(&mut self, message: &ReportMessage) -> Result<()> {
        let body = message
            .to_json()
            .map_err(|e| AgentError::emission(format!("Cannot serialize report: {}", e)))?;
        tracing::info!(target: REPORT_TARGET, "{}", body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfstats_core::EmissionRecord;

    #[test]
    fn test_tracing_sink_accepts_reports() {
        let mut record = EmissionRecord::new();
        record.insert("cpu".to_string(), serde_json::json!(1.5));
        let message = ReportMessage::new("monitoring-agent", record);

        assert!(TracingSink::new().send(&message).is_ok());
    }
}

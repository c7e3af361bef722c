use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Counters for one control/telemetry session.
#[derive(Clone)]
pub struct SessionMetrics {
    pub commands_sent: IntCounter,
    pub batches_received: IntCounter,
    pub recoveries: IntCounter,
    pub samples_last_batch: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub session: SessionMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let commands_sent = IntCounter::new("pm_commands_sent", "Total module commands sent")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let batches_received =
            IntCounter::new("pm_batches_received", "Total telemetry batches received")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let recoveries = IntCounter::new("pm_session_recoveries", "Total session recovery cycles")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let samples_last_batch = IntGauge::new(
            "pm_samples_last_batch",
            "Samples in the most recent telemetry batch",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let session = SessionMetrics {
            commands_sent,
            batches_received,
            recoveries,
            samples_last_batch,
        };
        let _ = registry.register(Box::new(session.commands_sent.clone()));
        let _ = registry.register(Box::new(session.batches_received.clone()));
        let _ = registry.register(Box::new(session.recoveries.clone()));
        let _ = registry.register(Box::new(session.samples_last_batch.clone()));
        Ok(Self { registry, session })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_encoding() {
        let hub = match MetricsHub::new() {
            Ok(h) => h,
            Err(e) => panic!("metrics init failed: {e}"),
        };
        hub.session.commands_sent.inc();
        hub.session.samples_last_batch.set(42);
        let text = hub.encode_text();
        assert!(text.contains("pm_commands_sent 1"));
        assert!(text.contains("pm_samples_last_batch 42"));
    }
}

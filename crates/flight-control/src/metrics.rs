use crate::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

/// Counters for the voice-to-flight pipeline.
#[derive(Clone)]
pub struct PilotMetrics {
    pub registry: Registry,
    pub utterances: IntCounter,
    pub recognized: IntCounter,
    pub unrecognized: IntCounter,
    pub negations: IntCounter,
    pub dispatched: IntCounter,
    pub preempted: IntCounter,
    pub worker_failures: IntCounter,
    /// Transcript received → command dispatched
    pub latency: Histogram,
}

impl PilotMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let utterances = counter("utterances_total", "Utterances received from the voice source")?;
        let recognized = counter(
            "commands_recognized_total",
            "Utterances mapped to a drone command",
        )?;
        let unrecognized = counter(
            "commands_unrecognized_total",
            "Utterances that matched no command",
        )?;
        let negations = counter("negations_total", "Utterances classified as a negation")?;
        let dispatched = counter("commands_dispatched_total", "Commands handed to a worker")?;
        let preempted = counter(
            "commands_preempted_total",
            "Commands cancelled by a newer command",
        )?;
        let worker_failures = counter(
            "worker_failures_total",
            "Workers that ended in an error or a panic",
        )?;

        let latency = Histogram::with_opts(
            HistogramOpts::new(
                "pipeline_latency_seconds",
                "Time from transcript to command dispatch",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            utterances,
            recognized,
            unrecognized,
            negations,
            dispatched,
            preempted,
            worker_failures,
            latency,
        })
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
    fn counters_show_up_in_text_output() {
        let m = PilotMetrics::new().unwrap();
        m.utterances.inc();
        m.dispatched.inc_by(2);
        m.latency.observe(0.02);
        let text = m.encode_text();
        assert!(text.contains("utterances_total 1"));
        assert!(text.contains("commands_dispatched_total 2"));
        assert!(text.contains("pipeline_latency_seconds_count 1"));
    }
}

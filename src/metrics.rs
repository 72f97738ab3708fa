use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub refresh_succeeded: IntCounter,
    pub refresh_failed: IntCounter,
    pub validation_failures: IntCounter,
    pub empty_fallbacks: IntCounter,
    pub resyncs_scheduled: IntCounter,
    pub change_events_coalesced: IntCounter,
    pub feed_reconnects: IntCounter,
    pub queries_served: IntCounter,
    registry: Arc<Registry>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::with_opts(Opts::new(name, help))
        .expect("counter names and help strings are static and valid");
    registry.register(Box::new(counter.clone())).ok();
    counter
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        Metrics {
            refresh_succeeded: counter(
                &registry,
                "refresh_succeeded",
                "Remote refreshes that published new data",
            ),
            refresh_failed: counter(
                &registry,
                "refresh_failed",
                "Remote refreshes that kept the previous snapshot",
            ),
            validation_failures: counter(
                &registry,
                "validation_failures",
                "Refreshes rejected because a row lacked the sort key",
            ),
            empty_fallbacks: counter(
                &registry,
                "empty_fallbacks",
                "Times empty data forced a reload of the local snapshot",
            ),
            resyncs_scheduled: counter(
                &registry,
                "resyncs_scheduled",
                "Change-driven resyncs scheduled",
            ),
            change_events_coalesced: counter(
                &registry,
                "change_events_coalesced",
                "Change events folded into an already scheduled resync",
            ),
            feed_reconnects: counter(
                &registry,
                "feed_reconnects",
                "Change feed resubscription attempts",
            ),
            queries_served: counter(&registry, "queries_served", "Queries executed"),
            registry: Arc::new(registry),
        }
    }

    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_exposes_counters() {
        let metrics = Metrics::new();
        metrics.queries_served.inc();
        metrics.resyncs_scheduled.inc_by(2);
        let text = metrics.gather();
        assert!(text.contains("queries_served 1"));
        assert!(text.contains("resyncs_scheduled 2"));
    }
}

//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    Encoder, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording application metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records one outbound call to the provider and how it ended.
    fn record_upstream_request(&self, endpoint: &str, result: &str);

    /// Records the wall time of one outbound call.
    fn record_upstream_duration(&self, endpoint: &str, duration_secs: f64);

    /// Records which branch produced a now-playing response.
    fn record_now_playing(&self, source: &str);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // Provider calls
    upstream_requests_total: CounterVec,
    upstream_duration_seconds: HistogramVec,

    // Aggregator outcomes
    now_playing_responses_total: CounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let upstream_requests_total = register_counter_vec_with_registry!(
            Opts::new(
                "spotify_upstream_requests_total",
                "Total requests sent to the Spotify accounts and Web APIs"
            ),
            &["endpoint", "result"],
            registry.clone()
        )
        .expect("Failed to register spotify_upstream_requests_total");

        let upstream_duration_seconds = register_histogram_vec_with_registry!(
            "spotify_upstream_duration_seconds",
            "Spotify request duration in seconds",
            &["endpoint"],
            vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )
        .expect("Failed to register spotify_upstream_duration_seconds");

        let now_playing_responses_total = register_counter_vec_with_registry!(
            Opts::new(
                "now_playing_responses_total",
                "Now-playing responses by the branch that produced them"
            ),
            &["source"],
            registry.clone()
        )
        .expect("Failed to register now_playing_responses_total");

        Metrics {
            registry,
            upstream_requests_total,
            upstream_duration_seconds,
            now_playing_responses_total,
        }
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl MetricsRecorder for Metrics {
    fn record_upstream_request(&self, endpoint: &str, result: &str) {
        self.upstream_requests_total
            .with_label_values(&[endpoint, result])
            .inc();
    }

    fn record_upstream_duration(&self, endpoint: &str, duration_secs: f64) {
        self.upstream_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    fn record_now_playing(&self, source: &str) {
        self.now_playing_responses_total
            .with_label_values(&[source])
            .inc();
    }
}

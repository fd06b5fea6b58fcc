use std::time::Duration;

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry};

/// Metrics collects and exposes HTTP server and business metrics.
pub struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
    network_traffic_bytes: CounterVec,
    orders_created_total: IntCounter,
    payments_total: CounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )?;
        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of errors"),
            &["source", "endpoint"],
        )?;
        let network_traffic_bytes = CounterVec::new(
            Opts::new("network_traffic_bytes", "Network traffic in bytes"),
            &["direction"],
        )?;
        let orders_created_total =
            IntCounter::new("orders_created_total", "Total number of orders created")?;
        let payments_total = CounterVec::new(
            Opts::new("payments_total", "Total number of payments recorded"),
            &["settled"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(network_traffic_bytes.clone()))?;
        registry.register(Box::new(orders_created_total.clone()))?;
        registry.register(Box::new(payments_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
            network_traffic_bytes,
            orders_created_total,
            payments_total,
        })
    }

    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    pub fn record_error(&self, source: &str, endpoint: &str) {
        self.errors_total.with_label_values(&[source, endpoint]).inc();
    }

    pub fn record_network_traffic(&self, direction: &str, bytes: usize) {
        self.network_traffic_bytes
            .with_label_values(&[direction])
            .inc_by(bytes as f64);
    }

    pub fn record_order_created(&self) {
        self.orders_created_total.inc();
    }

    /// `settled` tells whether this payment was the one that settled its order.
    pub fn record_payment(&self, settled: bool) {
        let label = if settled { "true" } else { "false" };
        self.payments_total.with_label_values(&[label]).inc();
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn encode(&self) -> prometheus::Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();

        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("GET", "/api/orders", 200, Duration::from_millis(3));
        metrics.record_order_created();
        metrics.record_payment(true);

        let text = metrics.encode().unwrap();
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("orders_created_total 1"));
        assert!(text.contains(r#"payments_total{settled="true"} 1"#));
    }
}

//! Token endpoint metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder the
//! calls are no-ops. Installing an exporter is up to the embedding service.
//!
//! - `token_requests_total` (counter): labels `kind` (token/refresh), `outcome`
//! - `token_request_duration_seconds` (histogram): label `kind`

pub const REQUESTS_TOTAL: &str = "token_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "token_request_duration_seconds";

/// Record one token endpoint round trip.
pub fn record_request(kind: &'static str, success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "error" };
    metrics::counter!(REQUESTS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "kind" => kind).record(duration_secs);
}

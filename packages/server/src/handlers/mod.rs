pub mod dlq;
pub mod trigger;

/// Liveness check.
pub async fn health() -> &'static str {
    "OK"
}

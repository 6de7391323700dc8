use std::time::{Duration, Instant};

/// Formats a `Duration` with automatic unit scaling, e.g. `1.94ms` or `2.34s`.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Logs a warning if more than `threshold` has passed since `start`.
pub fn log_if_slow(start: Instant, threshold: Duration, operation: &str) {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(operation, duration = fmt_duration(elapsed), "Slow operation");
    }
}

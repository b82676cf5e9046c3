//! Optional metrics instrumentation.
//!
//! With the `observe` feature enabled, units emit counters and histograms via
//! the [`metrics`] crate; the embedding application installs the recorder.
//! Without the feature every function here compiles to nothing.

/// Record a finished unit of work.
///
/// - `tally.unit.total` – counter with `op` and `outcome` labels
/// - `tally.unit.duration_seconds` – histogram with `op` label
#[inline]
pub fn record_unit(op: &'static str, duration: std::time::Duration, success: bool) {
    #[cfg(feature = "observe")]
    {
        let outcome = if success { "ok" } else { "fail" };
        metrics::counter!("tally.unit.total", "op" => op, "outcome" => outcome).increment(1);
        metrics::histogram!("tally.unit.duration_seconds", "op" => op)
            .record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (op, duration, success);
    }
}

/// Record members evicted by a capacity trim.
///
/// - `tally.capacity.evicted_total` – counter
#[inline]
pub fn record_evictions(count: usize) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("tally.capacity.evicted_total").increment(count as u64);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = count;
    }
}

/// Record a stripe lock wait.
///
/// - `tally.lock.wait_duration_seconds` – histogram
#[inline]
pub fn record_lock_wait(duration: std::time::Duration) {
    #[cfg(feature = "observe")]
    {
        metrics::histogram!("tally.lock.wait_duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = duration;
    }
}

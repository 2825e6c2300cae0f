//! Per-cycle metrics.
//!
//! [`CycleMetrics`] is returned by every
//! [`execute`](crate::CycleOrchestrator::execute) call. Counts are
//! sampled after the backend call and before the end-of-cycle clear.

use serde::Serialize;

/// Counts and timing for a single cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CycleMetrics {
    /// Simulation cycle number.
    pub cycle: u64,
    /// Channels written to the exchange graph.
    pub channels: usize,
    /// Host buffers live when the backend ran.
    pub buffers: usize,
    /// Bytes held by those buffers.
    pub buffer_bytes: usize,
    /// Ghost mask cache hits this cycle.
    pub mask_hits: u64,
    /// Ghost mask cache misses this cycle.
    pub mask_misses: u64,
    /// Entries skipped for an unsupported element type.
    pub skipped_entries: usize,
    /// Scalars updated from steering results.
    pub steering_pulled: usize,
    /// Whether the backend's `execute` succeeded.
    pub backend_ok: bool,
    /// Wall-clock time for the whole cycle, in microseconds.
    pub elapsed_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = CycleMetrics::default();
        assert_eq!(m.channels, 0);
        assert_eq!(m.buffers, 0);
        assert!(!m.backend_ok);
    }

    #[test]
    fn serializes_flat() {
        let m = CycleMetrics {
            cycle: 4,
            channels: 2,
            ..CycleMetrics::default()
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["cycle"], 4);
        assert_eq!(json["channels"], 2);
        assert_eq!(json["backend_ok"], false);
    }
}

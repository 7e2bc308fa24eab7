// THEORY:
// The session accumulator is the decoder's link-quality meter. It counts every
// processed region and every region whose header validated, and turns the two
// into a bit-error-rate proxy: the fraction of regions that failed to produce a
// valid frame. It also keeps the wall-clock time spent decoding so a run can
// report its mean per-region latency.
//
// The accumulator is mutated exactly once per processed region, in arrival order,
// by whoever owns the decoder. It never resets itself; where a session starts and
// ends (first N frames, end of stream) is the caller's decision.

use serde::Serialize;
use std::time::Duration;

/// Read-only view of the session counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub total: u64,
    pub valid: u64,
    /// `(total - valid) / total`, or 0.0 before the first region.
    pub bit_error_rate: f64,
    /// Mean decode time per region in milliseconds, or 0.0 before the first region.
    pub mean_latency_ms: f64,
}

/// Running counters for one decode session.
#[derive(Debug, Clone, Default)]
pub struct SessionAccumulator {
    total: u64,
    valid: u64,
    decode_time: Duration,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for one processed region.
    pub fn record(&mut self, valid: bool, elapsed: Duration) {
        self.total += 1;
        if valid {
            self.valid += 1;
        }
        self.decode_time += elapsed;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn valid(&self) -> u64 {
        self.valid
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        if self.total == 0 {
            return SessionSnapshot {
                total: 0,
                valid: 0,
                bit_error_rate: 0.0,
                mean_latency_ms: 0.0,
            };
        }
        let total = self.total as f64;
        SessionSnapshot {
            total: self.total,
            valid: self.valid,
            bit_error_rate: (self.total - self.valid) as f64 / total,
            mean_latency_ms: self.decode_time.as_secs_f64() * 1000.0 / total,
        }
    }

    /// Whether a periodic report is due after the latest region.
    pub fn report_due(&self, every: Option<u64>) -> bool {
        match every {
            Some(every) if every > 0 => self.total > 0 && self.total % every == 0,
            _ => false,
        }
    }

    /// Starts a new session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

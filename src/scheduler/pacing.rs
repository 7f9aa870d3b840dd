//! Tick deadlines for the periodic producer
//!
//! Deadlines advance by whole periods from the start time. When a tick
//! overruns, the deadlines it missed are dropped rather than fired back to
//! back.

/// Deadline tracker working in milliseconds of a monotonic clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    period_ms: u64,
    deadline_ms: u64,
}

impl Pacer {
    /// First tick one period after `now_ms`
    pub fn new(period_ms: u32, now_ms: u64) -> Self {
        let period_ms = u64::from(period_ms.max(1));
        Self {
            period_ms,
            deadline_ms: now_ms + period_ms,
        }
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    /// Move to the next deadline after a tick finished at `now_ms`
    ///
    /// Returns how many ticks were skipped because their deadline had
    /// already passed.
    pub fn advance(&mut self, now_ms: u64) -> u32 {
        self.deadline_ms += self.period_ms;
        if now_ms < self.deadline_ms {
            return 0;
        }
        let missed = (now_ms - self.deadline_ms) / self.period_ms + 1;
        self.deadline_ms += missed * self.period_ms;
        u32::try_from(missed).unwrap_or(u32::MAX)
    }
}

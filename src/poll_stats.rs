use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct PollStats {
    ticks: AtomicU64,
    failed_ticks: AtomicU64,
    gas_fallbacks: AtomicU64,
    discarded_ticks: AtomicU64,
}

impl Default for PollStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PollStats {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            failed_ticks: AtomicU64::new(0),
            gas_fallbacks: AtomicU64::new(0),
            discarded_ticks: AtomicU64::new(0),
        }
    }

    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_ticks(&self) {
        self.failed_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_gas_fallbacks(&self) {
        self.gas_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_discarded_ticks(&self) {
        self.discarded_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            failed_ticks: self.failed_ticks.load(Ordering::Relaxed),
            gas_fallbacks: self.gas_fallbacks.load(Ordering::Relaxed),
            discarded_ticks: self.discarded_ticks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PollSnapshot {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub gas_fallbacks: u64,
    pub discarded_ticks: u64,
}

use crate::analysis::comparator::ModelComparator;
use crate::config::AppConfig;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Request Counters (lock-free) ──

pub struct PerfCounters {
    pub comparisons_served: AtomicU64,
    pub analyses_served: AtomicU64,
    pub jump_fallbacks: AtomicU64,
    pub requests_rejected: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            comparisons_served: AtomicU64::new(0),
            analyses_served: AtomicU64::new(0),
            jump_fallbacks: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Application shared state (immutable models, atomic counters) ──

pub struct AppState {
    pub config: AppConfig,

    // Configured default models, shared by every request
    pub comparator: ModelComparator,

    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let comparator = ModelComparator::new(config.lattice, config.jump);
        Arc::new(Self {
            config,
            comparator,
            counters: PerfCounters::new(),
        })
    }
}

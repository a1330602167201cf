// Runtime metrics module
//
// Lightweight counters for the settings store and the asset loader

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process metrics
///
/// Uses atomic operations so the store and the loader can share one instance
/// behind an `Arc` without locks. Counters only ever increase.
#[derive(Debug)]
pub struct Metrics {
    /// Settings actions dispatched through the store
    pub settings_updates: AtomicU64,

    /// Persist attempts that failed against available storage
    pub persist_failures: AtomicU64,

    /// Manifest fetches issued by asset loaders
    pub manifest_fetches: AtomicU64,

    /// Assets successfully preloaded
    pub assets_preloaded: AtomicU64,

    /// Preload attempts that failed
    pub preload_failures: AtomicU64,

    /// Asset source reads answered from the byte cache
    pub cache_hits: AtomicU64,

    /// Sound cues rendered to a sink
    pub cues_played: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            settings_updates: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            manifest_fetches: AtomicU64::new(0),
            assets_preloaded: AtomicU64::new(0),
            preload_failures: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cues_played: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_settings_update(&self) {
        self.settings_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_manifest_fetch(&self) {
        self.manifest_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload(&self) {
        self.assets_preloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_failure(&self) {
        self.preload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cue_played(&self) {
        self.cues_played.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of preload attempts that succeeded, 1.0 when none were made
    pub fn preload_success_rate(&self) -> f64 {
        let ok = self.assets_preloaded.load(Ordering::Relaxed);
        let failed = self.preload_failures.load(Ordering::Relaxed);
        if ok + failed > 0 {
            ok as f64 / (ok + failed) as f64
        } else {
            1.0
        }
    }

    /// Multi-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "Uptime: {:.2}s\n\
             Settings: {} updates, {} persist failures\n\
             Assets: {} manifest fetches, {} preloaded, {} failed ({:.0}% ok), {} cache hits\n\
             Sound cues played: {}",
            self.uptime().as_secs_f64(),
            self.settings_updates.load(Ordering::Relaxed),
            self.persist_failures.load(Ordering::Relaxed),
            self.manifest_fetches.load(Ordering::Relaxed),
            self.assets_preloaded.load(Ordering::Relaxed),
            self.preload_failures.load(Ordering::Relaxed),
            self.preload_success_rate() * 100.0,
            self.cache_hits.load(Ordering::Relaxed),
            self.cues_played.load(Ordering::Relaxed)
        )
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Metrics Summary ===");
        for line in self.summary().lines() {
            tracing::info!("{}", line);
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

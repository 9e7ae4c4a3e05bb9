use crate::config::AppConfig;
use crate::db::DbPool;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Request Counters (lock-free) ──

pub struct RequestCounters {
    pub dashboards_computed: AtomicU64,
    pub trades_created: AtomicU64,
    pub trades_updated: AtomicU64,
    pub trades_deleted: AtomicU64,
    pub accounts_created: AtomicU64,
}

impl RequestCounters {
    pub fn new() -> Self {
        Self {
            dashboards_computed: AtomicU64::new(0),
            trades_created: AtomicU64::new(0),
            trades_updated: AtomicU64::new(0),
            trades_deleted: AtomicU64::new(0),
            accounts_created: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "dashboardsComputed": self.dashboards_computed.load(Ordering::Relaxed),
            "tradesCreated": self.trades_created.load(Ordering::Relaxed),
            "tradesUpdated": self.trades_updated.load(Ordering::Relaxed),
            "tradesDeleted": self.trades_deleted.load(Ordering::Relaxed),
            "accountsCreated": self.accounts_created.load(Ordering::Relaxed),
        })
    }
}

impl Default for RequestCounters {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application shared state ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub counters: RequestCounters,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Arc<Self> {
        Arc::new(Self {
            config,
            db,
            counters: RequestCounters::new(),
        })
    }
}

//! Sync engine: reconciles bulk refreshes, single-currency adds and the
//! persisted selection into one committed snapshot.
//!
//! All state lives in a [`SyncState`] behind a synchronous mutex that is never
//! held across an `.await`. Network calls run outside the lock and their
//! results are applied through the merge routines on [`SyncState`], which makes
//! every merge atomic with respect to readers.

pub mod recent;
pub mod scheduler;
pub mod state;
pub mod view;

use crate::core::config::AppConfig;
use crate::core::{RateBatch, RateProvider, Snapshot};
use crate::selection::SelectionStore;
use anyhow::{Result, anyhow};
use chrono::Utc;
use scheduler::RefreshScheduler;
use state::{AddIntent, SyncState};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use state::AddOutcome;
pub use view::{DashboardView, EngineState, Row, RowStatus};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub refresh_interval: Duration,
    /// Upper bound for any single provider call.
    pub fetch_timeout: Duration,
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

struct Inner {
    provider: Arc<dyn RateProvider>,
    state: Mutex<SyncState>,
    options: EngineOptions,
    changes: watch::Sender<u64>,
    scheduler: Mutex<Option<RefreshScheduler>>,
}

/// Cheap to clone; all clones drive the same engine.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

/// Non-owning handle, held by the scheduler so it never keeps the engine alive.
pub struct WeakSyncEngine {
    inner: Weak<Inner>,
}

impl WeakSyncEngine {
    pub fn upgrade(&self) -> Option<SyncEngine> {
        self.inner.upgrade().map(|inner| SyncEngine { inner })
    }
}

impl SyncEngine {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        selection: SelectionStore,
        options: EngineOptions,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                provider,
                state: Mutex::new(SyncState::new(selection)),
                options,
                changes,
                scheduler: Mutex::new(None),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakSyncEngine {
        WeakSyncEngine {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one mutation under the lock, then publishes a new revision.
    fn update<R>(&self, mutate: impl FnOnce(&mut SyncState) -> R) -> R {
        let result = {
            let mut state = self.lock();
            mutate(&mut state)
        };
        self.inner.changes.send_modify(|revision| *revision += 1);
        result
    }

    async fn bounded<T>(&self, fetch: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.inner.options.fetch_timeout;
        tokio::time::timeout(limit, fetch)
            .await
            .map_err(|_| anyhow!("Timed out after {}s", limit.as_secs()))?
    }

    fn current_date(&self) -> String {
        self.lock().snapshot().date.clone()
    }

    /// Fetches every selected code and replaces the snapshot. On failure the
    /// previous snapshot is kept and the error banner is raised.
    pub async fn refresh(&self) -> Result<()> {
        let ticket = self.update(SyncState::begin_bulk);
        debug!(seq = ticket.seq, codes = ?ticket.codes, "Bulk refresh started");

        let result = if ticket.codes.is_empty() {
            Ok(RateBatch {
                date: self.current_date(),
                currencies: Vec::new(),
                timestamp: Utc::now(),
            })
        } else {
            self.bounded(self.inner.provider.fetch_bulk(&ticket.codes))
                .await
        };

        match result {
            Ok(batch) => {
                let received = batch.currencies.len();
                let committed = self.update(|state| state.commit_bulk(&ticket, batch));
                info!(seq = ticket.seq, received, committed, "Bulk refresh finished");
                Ok(())
            }
            Err(e) => {
                self.update(|state| state.fail_bulk(&ticket, &e));
                warn!(seq = ticket.seq, error = %e, "Bulk refresh failed");
                Err(e)
            }
        }
    }

    /// Optimistically selects `code` and fetches it on its own.
    ///
    /// The selection changes before the first suspension point, so a second
    /// call for the same code while this one is in flight is a no-op.
    pub async fn add(&self, code: &str) -> AddOutcome {
        let (code, attempt) = match self.update(|state| state.begin_add(code)) {
            AddIntent::Fetch { code, attempt } => (code, attempt),
            AddIntent::Resurfaced => return AddOutcome::Resurfaced,
            AddIntent::AlreadyPending => return AddOutcome::AlreadyPending,
            AddIntent::Invalid => return AddOutcome::Invalid,
        };
        info!(code = %code, attempt, "Adding currency");

        let result = self.bounded(self.inner.provider.fetch_one(&code)).await;
        let outcome = self.update(|state| state.settle_add(&code, attempt, result));
        match &outcome {
            AddOutcome::Failed(message) => warn!(code = %code, %message, "Add failed"),
            AddOutcome::NotFound => warn!(code = %code, "Provider does not quote currency"),
            other => debug!(code = %code, outcome = ?other, "Add settled"),
        }
        outcome
    }

    /// Deselects `code` immediately. Never touches the network.
    pub fn remove(&self, code: &str) -> bool {
        let removed = self.update(|state| state.remove(code));
        if removed {
            info!(code, "Removed currency");
        }
        removed
    }

    /// Restores the default selection and resynchronizes.
    pub async fn reset_selection(&self) -> Result<()> {
        self.update(SyncState::reset_selection);
        info!("Selection reset to defaults");
        self.refresh().await
    }

    pub fn dismiss_error(&self) -> bool {
        self.update(SyncState::dismiss_bulk_error)
    }

    pub fn dismiss_add_error(&self, code: &str) -> bool {
        self.update(|state| state.dismiss_add_error(code))
    }

    pub fn view(&self) -> DashboardView {
        self.lock().view()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot().clone()
    }

    pub fn selection(&self) -> Vec<String> {
        self.lock().selection().to_vec()
    }

    pub fn state(&self) -> EngineState {
        self.lock().state()
    }

    pub fn is_alive(&self) -> bool {
        self.lock().is_alive()
    }

    /// Receiver that observes a new revision after every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Starts the periodic refresh; the first refresh fires right away.
    pub fn start(&self) {
        if !self.is_alive() {
            return;
        }
        let mut scheduler = self
            .inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if scheduler.is_none() {
            *scheduler = Some(RefreshScheduler::spawn(
                self,
                self.inner.options.refresh_interval,
            ));
        }
    }

    /// Stops the timer and makes in-flight results inert.
    pub fn shutdown(&self) {
        self.update(SyncState::shut_down);
        let scheduler = self
            .inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(scheduler) = scheduler {
            scheduler.stop();
        }
        info!("Sync engine shut down");
    }
}

//! Committed engine state and the merge routines that are the only writers of
//! the snapshot. Everything here is synchronous; callers hold the engine lock
//! for the duration of one call, so each merge is atomic.

use super::recent::RecentlySearched;
use super::view::{DashboardView, EngineState, Row, RowStatus};
use crate::core::{Currency, RateBatch, Snapshot};
use crate::selection::SelectionStore;
use anyhow::Error;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Identifies one bulk refresh and the codes it asked for.
#[derive(Debug, Clone)]
pub struct BulkTicket {
    pub seq: u64,
    pub codes: Vec<String>,
}

/// What an add intent turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddIntent {
    Fetch { code: String, attempt: u64 },
    Resurfaced,
    AlreadyPending,
    Invalid,
}

/// Final result of an add, reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Resurfaced,
    AlreadyPending,
    Invalid,
    NotFound,
    Failed(String),
    /// The code was removed, or the engine shut down, before the fetch settled.
    Discarded,
}

pub struct SyncState {
    selection: SelectionStore,
    snapshot: Snapshot,
    /// Codes with a single-add fetch in flight, mapped to their attempt id.
    pending: HashMap<String, u64>,
    provisional: HashSet<String>,
    recent: RecentlySearched,
    add_errors: BTreeMap<String, String>,
    bulk_error: Option<String>,
    bulk_in_flight: usize,
    bulk_issued: u64,
    bulk_committed: u64,
    next_attempt: u64,
    updated_at: Option<DateTime<Utc>>,
    /// Set once a bulk refresh has committed or failed.
    synced: bool,
    alive: bool,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl SyncState {
    pub fn new(selection: SelectionStore) -> Self {
        Self {
            selection,
            snapshot: Snapshot::empty(),
            pending: HashMap::new(),
            provisional: HashSet::new(),
            recent: RecentlySearched::new(),
            add_errors: BTreeMap::new(),
            bulk_error: None,
            bulk_in_flight: 0,
            bulk_issued: 0,
            bulk_committed: 0,
            next_attempt: 0,
            updated_at: None,
            synced: false,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn shut_down(&mut self) {
        self.alive = false;
    }

    pub fn state(&self) -> EngineState {
        if self.bulk_in_flight > 0 {
            EngineState::BulkRefreshing
        } else if self.bulk_error.is_some() {
            EngineState::Error
        } else {
            EngineState::Idle
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn selection(&self) -> &[String] {
        self.selection.codes()
    }

    pub fn is_pending(&self, code: &str) -> bool {
        self.pending.contains_key(code)
    }

    pub fn begin_bulk(&mut self) -> BulkTicket {
        self.bulk_issued += 1;
        self.bulk_in_flight += 1;
        BulkTicket {
            seq: self.bulk_issued,
            codes: self.selection.codes().to_vec(),
        }
    }

    /// Replaces the snapshot with a bulk result, ordered by the current
    /// selection. Returns false when the result was discarded as stale.
    pub fn commit_bulk(&mut self, ticket: &BulkTicket, batch: RateBatch) -> bool {
        self.bulk_in_flight = self.bulk_in_flight.saturating_sub(1);
        if !self.alive {
            return false;
        }
        if ticket.seq < self.bulk_committed {
            debug!(
                seq = ticket.seq,
                committed = self.bulk_committed,
                "Discarding stale bulk result"
            );
            return false;
        }
        self.bulk_committed = ticket.seq;

        let requested: HashSet<&str> = ticket.codes.iter().map(String::as_str).collect();
        let mut fetched: HashMap<String, Currency> = HashMap::new();
        for currency in batch.currencies {
            if requested.contains(currency.code.as_str()) {
                fetched.entry(currency.code.clone()).or_insert(currency);
            }
        }

        let mut currencies = Vec::with_capacity(self.selection.codes().len());
        for code in self.selection.codes() {
            if requested.contains(code.as_str()) {
                self.provisional.remove(code);
                if let Some(currency) = fetched.remove(code) {
                    self.pending.remove(code);
                    self.add_errors.remove(code);
                    currencies.push(currency);
                } else {
                    debug!(code = %code, "Code missing from bulk result, dropping");
                }
            } else if let Some(existing) = self.snapshot.get(code) {
                // Added after this refresh was issued
                currencies.push(existing.clone());
            }
        }

        self.snapshot = Snapshot {
            date: batch.date,
            currencies,
            timestamp: batch.timestamp,
        };
        self.bulk_error = None;
        self.updated_at = Some(batch.timestamp);
        self.synced = true;
        true
    }

    pub fn fail_bulk(&mut self, ticket: &BulkTicket, error: &Error) {
        self.bulk_in_flight = self.bulk_in_flight.saturating_sub(1);
        if !self.alive {
            return;
        }
        if ticket.seq < self.bulk_committed {
            debug!(seq = ticket.seq, "Ignoring failure of superseded bulk refresh");
            return;
        }
        self.bulk_error = Some(format!("Failed to load currency rates: {error:#}"));
        self.synced = true;
    }

    pub fn begin_add(&mut self, code: &str) -> AddIntent {
        let code = normalize_code(code);
        if code.is_empty() {
            return AddIntent::Invalid;
        }
        if self.pending.contains_key(&code) {
            return AddIntent::AlreadyPending;
        }
        if self.selection.contains(&code) {
            self.recent.touch(&code);
            return AddIntent::Resurfaced;
        }

        self.next_attempt += 1;
        let attempt = self.next_attempt;
        self.pending.insert(code.clone(), attempt);
        self.selection.add(&code);
        self.recent.touch(&code);
        self.add_errors.remove(&code);
        AddIntent::Fetch { code, attempt }
    }

    /// Applies the result of a single-add fetch.
    pub fn settle_add(
        &mut self,
        code: &str,
        attempt: u64,
        result: anyhow::Result<Option<Currency>>,
    ) -> AddOutcome {
        if !self.alive {
            return AddOutcome::Discarded;
        }
        if self.pending.get(code) == Some(&attempt) {
            self.pending.remove(code);
        }
        if !self.selection.contains(code) {
            debug!(code, "Code removed while its fetch was in flight");
            return AddOutcome::Discarded;
        }

        match result {
            Ok(Some(currency)) => {
                self.commit_single(currency);
                AddOutcome::Added
            }
            Ok(None) => {
                self.selection.remove(code);
                self.recent.remove(code);
                self.snapshot.currencies.retain(|c| c.code != code);
                self.provisional.remove(code);
                self.add_errors
                    .insert(code.to_string(), format!("Unknown currency: {code}"));
                AddOutcome::NotFound
            }
            Err(e) => {
                let message = format!("Failed to add {code}: {e:#}");
                self.add_errors.insert(code.to_string(), message.clone());
                AddOutcome::Failed(message)
            }
        }
    }

    /// Merges one freshly resolved currency, replacing any entry with the same
    /// code.
    pub fn commit_single(&mut self, currency: Currency) {
        let code = currency.code.clone();
        self.snapshot.currencies.retain(|c| c.code != code);
        self.snapshot.currencies.insert(0, currency);

        let selection = &self.selection;
        self.snapshot
            .currencies
            .sort_by_key(|c| selection.position(&c.code));

        let now = Utc::now();
        self.snapshot.timestamp = now;
        self.updated_at = Some(now);
        self.pending.remove(&code);
        self.add_errors.remove(&code);
        self.provisional.insert(code);
    }

    /// Drops `code` everywhere. Returns whether it was selected.
    pub fn remove(&mut self, code: &str) -> bool {
        let code = normalize_code(code);
        let removed = self.selection.remove(&code);
        self.snapshot.currencies.retain(|c| c.code != code);
        self.pending.remove(&code);
        self.provisional.remove(&code);
        self.recent.remove(&code);
        self.add_errors.remove(&code);
        removed
    }

    pub fn reset_selection(&mut self) {
        self.selection.reset();
        let selection = self.selection.codes().to_vec();
        self.snapshot
            .currencies
            .retain(|c| selection.contains(&c.code));
        self.pending.retain(|code, _| selection.contains(code));
        self.provisional.retain(|code| selection.contains(code));
        for code in self.recent.codes() {
            if !selection.contains(&code) {
                self.recent.remove(&code);
            }
        }
        self.add_errors.clear();
    }

    pub fn dismiss_bulk_error(&mut self) -> bool {
        self.bulk_error.take().is_some()
    }

    pub fn dismiss_add_error(&mut self, code: &str) -> bool {
        self.add_errors.remove(&normalize_code(code)).is_some()
    }

    pub fn view(&self) -> DashboardView {
        let rows = self
            .selection
            .codes()
            .iter()
            .map(|code| {
                let currency = self.snapshot.get(code).cloned();
                let status = match (&currency, self.pending.contains_key(code)) {
                    (Some(_), _) if self.provisional.contains(code) => RowStatus::Provisional,
                    (Some(_), _) => RowStatus::Confirmed,
                    (None, true) => RowStatus::Loading,
                    // Awaiting the first bulk refresh
                    (None, false) if !self.synced && !self.add_errors.contains_key(code) => {
                        RowStatus::Loading
                    }
                    (None, false) => RowStatus::Missing,
                };
                Row {
                    code: code.clone(),
                    currency,
                    status,
                }
            })
            .collect();

        DashboardView {
            state: self.state(),
            date: self.snapshot.date.clone(),
            updated_at: self.updated_at,
            synced: self.synced,
            rows,
            recently_searched: self.recent.codes(),
            bulk_error: self.bulk_error.clone(),
            add_errors: self
                .add_errors
                .iter()
                .map(|(code, message)| (code.clone(), message.clone()))
                .collect(),
        }
    }
}

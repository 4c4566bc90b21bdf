use crate::core::Currency;
use chrono::{DateTime, Utc};

/// Engine-wide refresh state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    BulkRefreshing,
    Error,
}

/// How a selected code should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Single-add fetch in flight, no data yet.
    Loading,
    /// Data came from a single-add fetch and no bulk refresh has confirmed it.
    Provisional,
    Confirmed,
    /// Selected but without data after a bulk refresh settled, or after a
    /// failed add.
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub code: String,
    pub currency: Option<Currency>,
    pub status: RowStatus,
}

/// Immutable picture of the engine for one render.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub state: EngineState,
    /// Source-reported date of the last bulk commit; empty before the first.
    pub date: String,
    pub updated_at: Option<DateTime<Utc>>,
    /// Whether any bulk refresh has committed or failed yet.
    pub synced: bool,
    /// One row per selected code, in selection order.
    pub rows: Vec<Row>,
    pub recently_searched: Vec<String>,
    pub bulk_error: Option<String>,
    /// Scoped single-add failures as `(code, message)`.
    pub add_errors: Vec<(String, String)>,
}

impl DashboardView {
    pub fn row(&self, code: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.code == code)
    }

    /// True until the first bulk refresh settles, including before it starts.
    pub fn is_loading(&self) -> bool {
        !self.synced
    }
}

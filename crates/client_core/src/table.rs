use std::sync::{Arc, Mutex};

use shared::domain::{MutationIntent, Record};
use tracing::{debug, warn};

use crate::{decode::decode_listing, error::ClientError, RelayClient};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Client-only sort/filter/pagination parameters. Independent of listing
/// content: a refresh replaces the listing underneath without resetting any
/// of these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub sort: Option<(SortColumn, SortDirection)>,
    pub filter: String,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

struct TableInner {
    listing: Arc<Vec<Record>>,
    view: ViewState,
    phase: LoadPhase,
    generation: u64,
    inflight: usize,
}

/// Owns the listing snapshot and view state, and dispatches mutations.
///
/// The listing is an immutable snapshot swapped atomically on refresh; view
/// operations touch only the view state and projections are pure functions
/// of (listing, view). Concurrent refreshes are allowed and the snapshot is
/// taken from whichever response completes last; responses started before a
/// `reset()` are discarded on arrival.
pub struct TableEngine {
    relay: RelayClient,
    inner: Mutex<TableInner>,
}

impl TableEngine {
    pub fn new(relay: RelayClient) -> Self {
        Self {
            relay,
            inner: Mutex::new(TableInner {
                listing: Arc::new(Vec::new()),
                view: ViewState::default(),
                phase: LoadPhase::Idle,
                generation: 0,
                inflight: 0,
            }),
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.lock().phase.clone()
    }

    pub fn view(&self) -> ViewState {
        self.lock().view.clone()
    }

    /// The latest committed listing snapshot, in engine order.
    pub fn current_listing(&self) -> Arc<Vec<Record>> {
        Arc::clone(&self.lock().listing)
    }

    /// Fetches `getAll`, decodes it, and swaps the snapshot in atomically.
    /// The lock is never held across the network call.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let generation = {
            let mut inner = self.lock();
            inner.phase = LoadPhase::Loading;
            inner.inflight += 1;
            inner.generation
        };

        let fetched = self.relay.fetch_all().await;

        let mut inner = self.lock();
        inner.inflight = inner.inflight.saturating_sub(1);
        if inner.generation != generation {
            warn!("discarding refresh response for a reset table");
            return Ok(());
        }
        match fetched {
            Ok(raw) => {
                let records = decode_listing(&raw);
                debug!(records = records.len(), "listing refreshed");
                inner.listing = Arc::new(records);
                inner.phase = if inner.inflight > 0 {
                    LoadPhase::Loading
                } else {
                    LoadPhase::Ready
                };
                Ok(())
            }
            Err(err) => {
                if inner.inflight == 0 {
                    inner.phase = LoadPhase::Failed(err.to_string());
                }
                Err(err)
            }
        }
    }

    /// One relay call, then the full refresh. A failed relay call returns
    /// before any state is touched, so the listing stays exactly as it was.
    pub async fn apply_mutation(&self, intent: MutationIntent) -> Result<String, ClientError> {
        let outcome = self.relay.apply(&intent).await?;
        self.refresh().await?;
        Ok(outcome)
    }

    /// Invalidates in-flight refreshes and clears the snapshot. Responses
    /// already on the wire are dropped when they land.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.inflight = 0;
        inner.listing = Arc::new(Vec::new());
        inner.view = ViewState::default();
        inner.phase = LoadPhase::Idle;
    }

    /// Toggles direction when the column is already the sort key, otherwise
    /// sorts ascending by the new column.
    pub fn sort_by(&self, column: SortColumn) {
        let mut inner = self.lock();
        inner.view.sort = match inner.view.sort {
            Some((current, SortDirection::Ascending)) if current == column => {
                Some((column, SortDirection::Descending))
            }
            _ => Some((column, SortDirection::Ascending)),
        };
    }

    pub fn set_filter(&self, filter: impl Into<String>) {
        let mut inner = self.lock();
        inner.view.filter = filter.into();
        inner.view.page = 0;
    }

    pub fn set_page(&self, page: usize) {
        self.lock().view.page = page;
    }

    pub fn next_page(&self) {
        let mut inner = self.lock();
        let pages = page_count(matching_rows(&inner.listing, &inner.view.filter).len());
        if inner.view.page + 1 < pages {
            inner.view.page += 1;
        }
    }

    pub fn prev_page(&self) {
        let mut inner = self.lock();
        inner.view.page = inner.view.page.saturating_sub(1);
    }

    /// Pure projection of (listing, view) to the rows on screen:
    /// filter, stable sort, then page slice. Idempotent, no state change.
    pub fn visible_rows(&self) -> Vec<Record> {
        let inner = self.lock();
        let mut rows = matching_rows(&inner.listing, &inner.view.filter);
        if let Some((column, direction)) = inner.view.sort {
            rows.sort_by(|a, b| {
                let ordering = match column {
                    SortColumn::Key => a.key.cmp(&b.key),
                    SortColumn::Value => a.value.cmp(&b.value),
                };
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        let pages = page_count(rows.len());
        let page = inner.view.page.min(pages.saturating_sub(1));
        rows.into_iter()
            .skip(page * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect()
    }

    /// Row count after filtering, before pagination.
    pub fn matching_row_count(&self) -> usize {
        let inner = self.lock();
        matching_rows(&inner.listing, &inner.view.filter).len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn matching_rows(listing: &[Record], filter: &str) -> Vec<Record> {
    let needle = filter.trim().to_lowercase();
    listing
        .iter()
        .filter(|record| needle.is_empty() || record.value.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

fn page_count(rows: usize) -> usize {
    rows.div_ceil(PAGE_SIZE).max(1)
}

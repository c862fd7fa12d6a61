//! Synchronization driver
//!
//! [`SyncContext`] owns the row set, the shared parameters, the selection,
//! the side panel and the error log for one application session. It issues
//! one refresh per row whenever the row set is rebuilt or a shared parameter
//! changes, and applies each completion through the row store.
//!
//! Refreshes run as Tokio tasks; every trigger returns a [`RefreshBatch`]
//! that can be awaited or dropped (dropping does not cancel the refreshes).

use crate::config::{AppConfig, SyncConfig};
use crate::error::{ExpansionError, SyncError};
use crate::error_log::ErrorLog;
use crate::expansion;
use crate::merge;
use crate::panel::PanelState;
use crate::params::{SelectionState, SharedParameters};
use crate::row::{Row, RowKey};
use crate::store::{DiscardReason, RefreshOutcome, RefreshTicket, RowStore};
use futures::future::join_all;
use insu_upstream::{HttpUpstream, Upstream};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub(crate) struct SyncState {
    pub(crate) store: RowStore,
    pub(crate) params: SharedParameters,
    pub(crate) selection: SelectionState,
    pub(crate) panel: PanelState,
}

pub(crate) struct Inner {
    pub(crate) upstream: Arc<dyn Upstream>,
    pub(crate) config: SyncConfig,
    pub(crate) state: Mutex<SyncState>,
    pub(crate) errors: ErrorLog,
    limiter: Option<Semaphore>,
}

impl Inner {
    async fn run_refresh(&self, ticket: RefreshTicket) -> RefreshOutcome {
        let _permit = match &self.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        let query = ticket.query();
        let patch = merge::fetch_patch(
            self.upstream.as_ref(),
            &query,
            ticket.params.base_amount,
            self.config.fetch_premium_range,
        )
        .await;

        let outcome = self.state.lock().store.apply(&ticket, patch);
        match &outcome {
            RefreshOutcome::Applied(key) => {
                tracing::debug!(%key, generation = ticket.generation, "row patched");
            }
            RefreshOutcome::Discarded(key, reason) => {
                tracing::debug!(%key, generation = ticket.generation, ?reason, "row patch discarded");
            }
        }
        outcome
    }
}

/// Refreshes issued by one trigger
#[derive(Debug, Default)]
pub struct RefreshBatch {
    tickets: Vec<RefreshTicket>,
    handles: Vec<JoinHandle<RefreshOutcome>>,
}

impl RefreshBatch {
    /// Tickets of every refresh in this batch, in row order
    #[inline]
    #[must_use]
    pub fn tickets(&self) -> &[RefreshTicket] {
        &self.tickets
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Wait for every refresh to settle
    pub async fn settle(self) -> Vec<RefreshOutcome> {
        let results = join_all(self.handles).await;
        self.tickets
            .into_iter()
            .zip(results)
            .map(|(ticket, result)| {
                result.unwrap_or_else(|err| {
                    tracing::error!(key = %ticket.key, "refresh task failed: {err}");
                    RefreshOutcome::Discarded(ticket.key, DiscardReason::TaskFailed)
                })
            })
            .collect()
    }
}

/// Result of a primary code selection
#[derive(Debug)]
pub enum SelectionOutcome {
    /// Row set replaced; one refresh per row is in flight
    Expanded(RefreshBatch),
    /// Primary detail unavailable; the row set is empty
    Failed(ExpansionError),
    /// A newer selection started before this one finished
    Superseded,
}

impl SelectionOutcome {
    /// Refresh batch of a successful selection
    #[must_use]
    pub fn into_batch(self) -> Option<RefreshBatch> {
        match self {
            Self::Expanded(batch) => Some(batch),
            Self::Failed(_) | Self::Superseded => None,
        }
    }

    /// Wait for the selection's refreshes (none unless expanded)
    pub async fn settle(self) -> Vec<RefreshOutcome> {
        match self {
            Self::Expanded(batch) => batch.settle().await,
            Self::Failed(_) | Self::Superseded => Vec::new(),
        }
    }
}

/// Session context for the comparison table
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct SyncContext {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("config", &self.inner.config)
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    /// Create a context over `upstream` with default configuration
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self::build(upstream, SyncConfig::default())
    }

    /// Create a context over `upstream`
    ///
    /// # Errors
    /// `SyncError::Config` when `config` fails [`SyncConfig::validate`]
    pub fn with_config(upstream: Arc<dyn Upstream>, config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self::build(upstream, config))
    }

    /// `config` must already be valid
    fn build(upstream: Arc<dyn Upstream>, config: SyncConfig) -> Self {
        let state = SyncState {
            params: config.initial_parameters(),
            ..SyncState::default()
        };
        let limiter = config.max_in_flight.map(Semaphore::new);
        Self {
            inner: Arc::new(Inner {
                upstream,
                config,
                state: Mutex::new(state),
                errors: ErrorLog::new(),
                limiter,
            }),
        }
    }

    /// Create a context talking HTTP to the configured backend
    ///
    /// # Errors
    /// `SyncError::Config` on invalid settings, `SyncError::Upstream` if the
    /// HTTP client cannot be built
    pub fn from_config(config: &AppConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let upstream = HttpUpstream::new(&config.upstream)?;
        Ok(Self::build(Arc::new(upstream), config.sync.clone()))
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Snapshot of the current row set
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        self.inner.state.lock().store.rows().to_vec()
    }

    /// Current shared parameters
    #[must_use]
    pub fn params(&self) -> SharedParameters {
        self.inner.state.lock().params
    }

    /// Current selection
    #[must_use]
    pub fn selection(&self) -> SelectionState {
        self.inner.state.lock().selection.clone()
    }

    /// The session error log
    #[inline]
    #[must_use]
    pub fn error_log(&self) -> &ErrorLog {
        &self.inner.errors
    }

    /// Select a primary code, rebuild the row set and refresh every row
    ///
    /// The previous row set is dropped immediately; refreshes still in flight
    /// for it are discarded when they complete.
    pub async fn select_primary_code(&self, code: &str) -> SelectionOutcome {
        let epoch = {
            let mut state = self.inner.state.lock();
            state.selection.select(code);
            state.store.begin_selection()
        };
        tracing::info!(code, epoch, "selecting primary code");

        let expansion =
            match expansion::expand(self.inner.upstream.as_ref(), code, &self.inner.errors).await {
                Ok(expansion) => expansion,
                Err(err) => {
                    tracing::error!(code, "expansion failed: {err}");
                    return SelectionOutcome::Failed(err);
                }
            };

        let row_count = expansion.rows.len();
        let tickets = {
            let mut state = self.inner.state.lock();
            if !state.store.replace(epoch, expansion.rows) {
                tracing::info!(code, epoch, "selection superseded before expansion finished");
                return SelectionOutcome::Superseded;
            }
            state.selection.related_codes = expansion.related;
            let params = state.params;
            state.store.issue_all(params)
        };

        tracing::info!(code, rows = row_count, "row set replaced");
        SelectionOutcome::Expanded(self.spawn(tickets))
    }

    /// Set the applicant age and refresh every row
    pub fn set_age(&self, age: u32) -> RefreshBatch {
        let tickets = {
            let mut state = self.inner.state.lock();
            state.params.age = age;
            let params = state.params;
            state.store.issue_all(params)
        };
        tracing::info!(age, rows = tickets.len(), "age changed");
        self.spawn(tickets)
    }

    /// Set the base coverage amount and refresh every row
    pub fn set_base_amount(&self, base_amount: u64) -> RefreshBatch {
        let tickets = {
            let mut state = self.inner.state.lock();
            state.params.base_amount = base_amount;
            let params = state.params;
            state.store.issue_all(params)
        };
        tracing::info!(base_amount, rows = tickets.len(), "base amount changed");
        self.spawn(tickets)
    }

    /// Refresh every row with the current parameters
    pub fn refresh_all(&self) -> RefreshBatch {
        let tickets = {
            let mut state = self.inner.state.lock();
            let params = state.params;
            state.store.issue_all(params)
        };
        self.spawn(tickets)
    }

    /// Refresh one row; `None` if no row matches `key`
    pub fn refresh_row(&self, key: &RowKey) -> Option<RefreshBatch> {
        let ticket = {
            let mut state = self.inner.state.lock();
            let params = state.params;
            state.store.issue(key, params)?
        };
        Some(self.spawn(vec![ticket]))
    }

    /// Spawn one task per ticket
    ///
    /// Must be called from within a Tokio runtime.
    fn spawn(&self, tickets: Vec<RefreshTicket>) -> RefreshBatch {
        let handles = tickets
            .iter()
            .cloned()
            .map(|ticket| {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move { inner.run_refresh(ticket).await })
            })
            .collect();
        RefreshBatch { tickets, handles }
    }

    /// Current row set epoch
    #[cfg(test)]
    pub(crate) fn epoch(&self) -> u64 {
        self.inner.state.lock().store.epoch()
    }
}

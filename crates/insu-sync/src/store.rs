//! Row store: the single serialized update path for the row set
//!
//! Every refresh is issued a [`RefreshTicket`]. A completion is applied only
//! if its ticket still belongs to the current row set (same epoch), its key
//! still matches a row, and no newer refresh has been issued for that row.

use crate::params::SharedParameters;
use crate::row::{Row, RowKey, RowPatch};
use insu_upstream::TermQuery;

/// Identity of one issued refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    /// Row set the refresh was issued against
    pub epoch: u64,
    /// Target row
    pub key: RowKey,
    /// Issue order, monotonic across the whole store
    pub generation: u64,
    /// Parameters captured at issue time
    pub params: SharedParameters,
}

impl RefreshTicket {
    /// Lookup query for this refresh
    #[inline]
    #[must_use]
    pub fn query(&self) -> TermQuery {
        self.key.query(self.params.age)
    }
}

/// Why a completed refresh was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    /// The row set was replaced by a newer selection
    StaleSelection,
    /// A newer refresh was issued for the same row
    Superseded,
    /// The refresh task did not complete
    TaskFailed,
}

/// Settled result of one refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Patch applied to the row
    Applied(RowKey),
    /// Patch dropped
    Discarded(RowKey, DiscardReason),
}

impl RefreshOutcome {
    /// Target row key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &RowKey {
        match self {
            Self::Applied(key) | Self::Discarded(key, _) => key,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RowStore {
    rows: Vec<Row>,
    epoch: u64,
    next_generation: u64,
}

impl RowStore {
    pub(crate) fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[cfg(test)]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Clear the row set and start a new epoch
    pub(crate) fn begin_selection(&mut self) -> u64 {
        self.epoch += 1;
        self.rows.clear();
        self.epoch
    }

    /// Replace the row set if `epoch` is still current
    pub(crate) fn replace(&mut self, epoch: u64, rows: Vec<Row>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.rows = rows;
        true
    }

    fn ticket_for(&mut self, row_index: usize, params: SharedParameters) -> RefreshTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        let row = &mut self.rows[row_index];
        row.generation = generation;
        RefreshTicket {
            epoch: self.epoch,
            key: row.key().clone(),
            generation,
            params,
        }
    }

    /// Issue one ticket per current row
    pub(crate) fn issue_all(&mut self, params: SharedParameters) -> Vec<RefreshTicket> {
        (0..self.rows.len())
            .map(|idx| self.ticket_for(idx, params))
            .collect()
    }

    /// Issue a ticket for the row matching `key`
    pub(crate) fn issue(&mut self, key: &RowKey, params: SharedParameters) -> Option<RefreshTicket> {
        let idx = self.rows.iter().position(|r| r.key().matches(key))?;
        Some(self.ticket_for(idx, params))
    }

    /// Apply a completed refresh
    pub(crate) fn apply(&mut self, ticket: &RefreshTicket, patch: RowPatch) -> RefreshOutcome {
        let discard = |reason| RefreshOutcome::Discarded(ticket.key.clone(), reason);

        if ticket.epoch != self.epoch {
            return discard(DiscardReason::StaleSelection);
        }
        // rows are only replaced wholesale under a new epoch, so a ticket of
        // the current epoch always finds its row
        let Some(row) = self.rows.iter_mut().find(|r| r.key().matches(&ticket.key)) else {
            return discard(DiscardReason::StaleSelection);
        };
        if ticket.generation < row.generation {
            return discard(DiscardReason::Superseded);
        }

        row.apply(patch);
        RefreshOutcome::Applied(ticket.key.clone())
    }
}

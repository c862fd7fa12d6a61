//! Insu Sync - comparison table row engine
//!
//! Keeps the rows of an insurance product comparison table consistent with
//! the backend:
//! - Expands a selected primary code into one row per term combination,
//!   followed by the rows of every related secondary code
//! - Refreshes every row's derived fields whenever the row set is rebuilt or
//!   a shared parameter (age, base amount) changes
//! - Applies only the latest refresh per row, and never one issued against a
//!   replaced row set
//! - Records user-visible failures in an ordered [`ErrorLog`]
//!
//! # Example
//!
//! ```rust,ignore
//! use insu_sync::{AppConfig, SyncContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = SyncContext::from_config(&AppConfig::default())?;
//!
//! ctx.select_primary_code("21686").await.settle().await;
//! ctx.set_age(30).settle().await;
//!
//! for row in ctx.rows() {
//!     println!("{} {:?}", row.key(), row.availability_summary);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Row engine
pub mod driver;
pub mod expansion;
pub mod merge;
pub mod row;
pub mod store;

// Session state
pub mod error_log;
pub mod panel;
pub mod params;

// Setup
pub mod config;
pub mod error;

// Re-exports for convenience
pub use config::{AppConfig, SyncConfig};
pub use driver::{RefreshBatch, SelectionOutcome, SyncContext};
pub use error::{ConfigError, ExpansionError, SyncError};
pub use error_log::ErrorLog;
pub use expansion::{expand, Expansion};
pub use merge::{availability_summary, fetch_patch, merge_patch};
pub use panel::{LimitSummary, PanelState, ProductSummary};
pub use params::{SelectionState, SharedParameters};
pub use row::{RangePatch, Row, RowKey, RowPatch, RowRole, TERM_SENTINEL, UNNAMED_PRODUCT};
pub use store::{DiscardReason, RefreshOutcome, RefreshTicket};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a comparison table
    pub use crate::{
        AppConfig, ErrorLog, RefreshBatch, RefreshOutcome, Row, RowKey, SelectionOutcome,
        SharedParameters, SyncConfig, SyncContext,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

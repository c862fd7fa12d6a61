//! Insu Upstream - product backend lookups
//!
//! Provides:
//! - Wire types for every backend endpoint, decoded defensively
//! - The [`Upstream`] trait the comparison engine fetches through
//! - A structured [`FetchError`] instead of free-form failure text
//! - [`HttpUpstream`], the `reqwest` implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use insu_upstream::{HttpUpstream, TermQuery, Upstream, UpstreamConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = HttpUpstream::new(&UpstreamConfig::new())?;
//! let check = http.data_check(&TermQuery::new("21686", 15, "—", "—")).await?;
//! println!("premium rate present: {}", check.has_prem_rate());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::{FetchResult, Upstream};
pub use error::{FailureClass, FetchError, FetchErrorKind};
pub use http::{HttpUpstream, UpstreamConfig};
pub use types::{
    CodeEntry, CodeKind, ContractTerms, DataCheck, LimitInfo, PdfFile, PolicyTerms,
    PremiumByTerms, PremiumRange, ProductDetail, RelatedCode, RelatedCodes, TermQuery,
    TermsField,
};

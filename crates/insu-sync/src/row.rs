//! Row identity and row state
//!
//! A row is identified by `(code, insurance_term, payment_term)`. Keys are
//! compared exactly; canonicalization of absent terms happens once, when a
//! row is built from backend data (see [`canonical_term`]).

use insu_upstream::TermQuery;
use serde::Serialize;
use std::fmt;

/// Placeholder meaning "term not specified"
pub const TERM_SENTINEL: &str = "—";

/// Display name used when the backend gives none
pub const UNNAMED_PRODUCT: &str = "상품명 없음";

/// Canonical form of an upstream term field
///
/// Absent, empty and whitespace-only values all become [`TERM_SENTINEL`];
/// anything else is kept verbatim.
#[must_use]
pub fn canonical_term(raw: Option<&str>) -> String {
    match raw {
        Some(term) if !term.trim().is_empty() => term.to_string(),
        _ => TERM_SENTINEL.to_string(),
    }
}

/// Identity of a displayable row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowKey {
    pub code: String,
    pub insurance_term: String,
    pub payment_term: String,
}

impl RowKey {
    /// Create a key from already-canonical parts
    #[inline]
    pub fn new(
        code: impl Into<String>,
        insurance_term: impl Into<String>,
        payment_term: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            insurance_term: insurance_term.into(),
            payment_term: payment_term.into(),
        }
    }

    /// Key with both terms unspecified
    #[inline]
    pub fn unspecified(code: impl Into<String>) -> Self {
        Self::new(code, TERM_SENTINEL, TERM_SENTINEL)
    }

    /// Exact match on all three parts, sentinel included
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &RowKey) -> bool {
        self == other
    }

    /// Lookup query for this key at `age`
    #[inline]
    #[must_use]
    pub fn query(&self, age: u32) -> TermQuery {
        TermQuery::new(
            self.code.clone(),
            age,
            self.insurance_term.clone(),
            self.payment_term.clone(),
        )
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.code, self.insurance_term, self.payment_term)
    }
}

/// Whether a row comes from the selected code or a related one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RowRole {
    /// Selected primary code (주계약)
    Primary,
    /// Related secondary code (특약)
    Secondary,
}

impl RowRole {
    /// Label shown in the table
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RowRole::Primary => "주계약",
            RowRole::Secondary => "특약",
        }
    }
}

impl fmt::Display for RowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Premium range update; `None` bounds mean "not loaded"
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangePatch {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Partial update of one row's derived fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowPatch {
    pub availability_summary: String,
    pub male_premium: Option<f64>,
    pub female_premium: Option<f64>,
    /// Range fields are left untouched when `None`
    pub premium_range: Option<RangePatch>,
    pub row_error: Option<String>,
}

/// One displayable row of the comparison table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    #[serde(flatten)]
    key: RowKey,
    role: RowRole,
    pub display_name: String,
    pub age_range: String,
    pub availability_summary: Option<String>,
    pub min_premium_range: Option<f64>,
    pub max_premium_range: Option<f64>,
    pub male_premium: Option<f64>,
    pub female_premium: Option<f64>,
    pub row_error: Option<String>,
    /// Latest refresh generation issued for this row
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl Row {
    /// Create an unpatched row
    #[must_use]
    pub fn new(
        key: RowKey,
        role: RowRole,
        display_name: impl Into<String>,
        age_range: impl Into<String>,
    ) -> Self {
        Self {
            key,
            role,
            display_name: display_name.into(),
            age_range: age_range.into(),
            availability_summary: None,
            min_premium_range: None,
            max_premium_range: None,
            male_premium: None,
            female_premium: None,
            row_error: None,
            generation: 0,
        }
    }

    /// Row identity
    #[inline]
    #[must_use]
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    /// Row role, fixed at creation
    #[inline]
    #[must_use]
    pub fn role(&self) -> RowRole {
        self.role
    }

    /// Product code
    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.key.code
    }

    /// Whether any derived field has been patched
    #[must_use]
    pub fn is_patched(&self) -> bool {
        self.availability_summary.is_some()
    }

    pub(crate) fn apply(&mut self, patch: RowPatch) {
        self.availability_summary = Some(patch.availability_summary);
        self.male_premium = patch.male_premium;
        self.female_premium = patch.female_premium;
        if let Some(range) = patch.premium_range {
            self.min_premium_range = range.min;
            self.max_premium_range = range.max;
        }
        self.row_error = patch.row_error;
    }
}

/// Equality over displayed state; the refresh generation is bookkeeping
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.role == other.role
            && self.display_name == other.display_name
            && self.age_range == other.age_range
            && self.availability_summary == other.availability_summary
            && self.min_premium_range == other.min_premium_range
            && self.max_premium_range == other.max_premium_range
            && self.male_premium == other.male_premium
            && self.female_premium == other.female_premium
            && self.row_error == other.row_error
    }
}

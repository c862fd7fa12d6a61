//! Shared inputs and selection state

use insu_upstream::RelatedCode;
use serde::Serialize;

/// Default applicant age
pub const DEFAULT_AGE: u32 = 15;

/// Default base coverage amount
pub const DEFAULT_BASE_AMOUNT: u64 = 100;

/// Inputs every row refresh is computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedParameters {
    /// Applicant age
    pub age: u32,
    /// Base coverage amount
    pub base_amount: u64,
}

impl SharedParameters {
    /// Create parameters
    #[inline]
    #[must_use]
    pub fn new(age: u32, base_amount: u64) -> Self {
        Self { age, base_amount }
    }
}

impl Default for SharedParameters {
    fn default() -> Self {
        Self::new(DEFAULT_AGE, DEFAULT_BASE_AMOUNT)
    }
}

/// Current primary selection and what was discovered from it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selected_primary_code: Option<String>,
    pub related_codes: Vec<RelatedCode>,
}

impl SelectionState {
    /// Start a new selection, dropping previously discovered codes
    pub(crate) fn select(&mut self, code: &str) {
        self.selected_primary_code = Some(code.to_string());
        self.related_codes.clear();
    }

    /// Forget the selection entirely
    pub(crate) fn clear(&mut self) {
        self.selected_primary_code = None;
        self.related_codes.clear();
    }

    /// Codes of the discovered secondary products
    #[must_use]
    pub fn related_code_list(&self) -> Vec<&str> {
        self.related_codes.iter().map(|r| r.code.as_str()).collect()
    }
}

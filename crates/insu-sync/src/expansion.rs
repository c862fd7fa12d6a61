//! Row expansion: one primary code into the full row set
//!
//! # Workflow
//! 1. Fetch the primary detail (fatal on failure)
//! 2. Discover related secondary codes (failure logged, treated as none)
//! 3. Fetch every secondary detail concurrently (failure logged, placeholder row)
//! 4. Concatenate primary rows and secondary rows in discovery order

use crate::error::ExpansionError;
use crate::error_log::ErrorLog;
use crate::row::{canonical_term, Row, RowKey, RowRole, TERM_SENTINEL, UNNAMED_PRODUCT};
use futures::future::join_all;
use insu_upstream::{PolicyTerms, ProductDetail, RelatedCode, Upstream};
use std::collections::HashSet;

/// Result of a successful expansion
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    /// Primary rows followed by secondary rows
    pub rows: Vec<Row>,
    /// Secondary codes as discovered
    pub related: Vec<RelatedCode>,
}

fn row_from_terms(code: &str, name: &str, terms: Option<&PolicyTerms>, role: RowRole) -> Row {
    let key = RowKey::new(
        code,
        canonical_term(terms.and_then(|t| t.insu_term.as_deref())),
        canonical_term(terms.and_then(|t| t.pay_term.as_deref())),
    );
    let age_range = canonical_term(terms.and_then(|t| t.age_range.as_deref()));
    Row::new(key, role, name, age_range)
}

/// Rows for one product detail: one per term combination, at least one
#[must_use]
pub fn rows_for_product(code: &str, detail: &ProductDetail, role: RowRole) -> Vec<Row> {
    let name = detail
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(UNNAMED_PRODUCT);

    match detail.term_combinations() {
        Some(combos) => combos
            .iter()
            .map(|terms| row_from_terms(code, name, Some(terms), role))
            .collect(),
        None => vec![row_from_terms(code, name, detail.single_terms(), role)],
    }
}

/// Single row for a code whose detail could not be fetched
#[must_use]
pub fn placeholder_row(code: &str, role: RowRole) -> Row {
    Row::new(RowKey::unspecified(code), role, UNNAMED_PRODUCT, TERM_SENTINEL)
}

/// Drop rows whose key already appeared earlier
fn dedupe(rows: Vec<Row>) -> Vec<Row> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| {
            let fresh = seen.insert(row.key().clone());
            if !fresh {
                tracing::debug!(key = %row.key(), "dropping duplicate row key");
            }
            fresh
        })
        .collect()
}

async fn discover_related(
    upstream: &dyn Upstream,
    primary_code: &str,
    log: &ErrorLog,
) -> Vec<RelatedCode> {
    match upstream.related_codes(primary_code).await {
        Ok(related) => {
            // the backend already prefixes this message
            if let Some(error) = related.error {
                log.append(error);
                return Vec::new();
            }
            related
                .related_codes
                .into_iter()
                .filter(|r| {
                    let usable = !r.code.trim().is_empty();
                    if !usable {
                        tracing::warn!(primary = primary_code, "skipping related entry without code");
                    }
                    usable
                })
                .collect()
        }
        Err(err) => {
            log.append(format!("관련 코드 조회 실패: {err}"));
            Vec::new()
        }
    }
}

/// Expand `primary_code` into its row set
///
/// # Errors
/// `ExpansionError::PrimaryUnavailable` if the primary detail fetch fails;
/// the failure is also appended to `log`.
pub async fn expand(
    upstream: &dyn Upstream,
    primary_code: &str,
    log: &ErrorLog,
) -> Result<Expansion, ExpansionError> {
    let primary = match upstream.product(primary_code).await {
        Ok(detail) => detail,
        Err(source) => {
            log.append(format!("주계약 {primary_code} 선택 실패: {source}"));
            return Err(ExpansionError::PrimaryUnavailable {
                code: primary_code.to_string(),
                source,
            });
        }
    };

    let mut rows = rows_for_product(primary_code, &primary, RowRole::Primary);
    tracing::debug!(code = primary_code, rows = rows.len(), "primary rows");

    let related = discover_related(upstream, primary_code, log).await;
    tracing::debug!(code = primary_code, related = related.len(), "related codes");

    let details = join_all(related.iter().map(|r| upstream.product(&r.code))).await;
    for (code, detail) in related.iter().map(|r| r.code.as_str()).zip(details) {
        match detail {
            Ok(detail) => rows.extend(rows_for_product(code, &detail, RowRole::Secondary)),
            Err(err) => {
                log.append(format!("특약 코드 {code} 조회 실패: {err}"));
                rows.push(placeholder_row(code, RowRole::Secondary));
            }
        }
    }

    Ok(Expansion {
        rows: dedupe(rows),
        related,
    })
}

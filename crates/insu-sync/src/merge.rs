//! Field merge: per-row lookups folded into one [`RowPatch`]

use crate::row::{RangePatch, RowPatch};
use insu_upstream::{
    DataCheck, FailureClass, FetchError, PremiumByTerms, PremiumRange, TermQuery, Upstream,
};

/// Availability summary shown when the lookups themselves failed
pub const AVAILABILITY_UNREACHABLE: &str = "백엔드 연결 실패";

/// Row error for a backend that could not be reached
pub const TRANSPORT_FAILURE: &str = "백엔드 서버 연결 실패";

/// Row error for a backend answering with 5xx
pub const SERVER_FAILURE: &str = "서버 내부 오류";

/// Prefix of the row error for any other failure
pub const GENERIC_FAILURE: &str = "데이터 조회 실패";

fn yes_no(flag: bool) -> char {
    if flag {
        'Y'
    } else {
        'N'
    }
}

/// `"준비금키 <Y/N>/준비금 <Y/N>/보험료 <Y/N>"`; omitted flags read as `N`
#[must_use]
pub fn availability_summary(check: &DataCheck) -> String {
    format!(
        "준비금키 {}/준비금 {}/보험료 {}",
        yes_no(check.has_rsv_key()),
        yes_no(check.has_rsv_rate()),
        yes_no(check.has_prem_rate()),
    )
}

/// Merge successful lookups into a patch
#[must_use]
pub fn merge_patch(
    check: DataCheck,
    premium: PremiumByTerms,
    range: Option<PremiumRange>,
) -> RowPatch {
    let availability_summary = availability_summary(&check);

    let mut errors = check.errors;
    errors.extend(premium.errors);
    let premium_range = range.map(|r| {
        errors.extend(r.errors);
        RangePatch {
            min: r.man_min,
            max: r.man_max,
        }
    });

    RowPatch {
        availability_summary,
        male_premium: premium.man_premium,
        female_premium: premium.fml_premium,
        premium_range,
        row_error: if errors.is_empty() {
            None
        } else {
            Some(errors.join(", "))
        },
    }
}

/// Row error text for a failed lookup
#[must_use]
pub fn failure_message(err: &FetchError) -> String {
    match err.class() {
        FailureClass::Transport => TRANSPORT_FAILURE.to_string(),
        FailureClass::Server => SERVER_FAILURE.to_string(),
        FailureClass::Generic => format!("{GENERIC_FAILURE}: {err}"),
    }
}

/// Patch for a row whose lookups failed outright
#[must_use]
pub fn failure_patch(err: &FetchError, range_requested: bool) -> RowPatch {
    RowPatch {
        availability_summary: AVAILABILITY_UNREACHABLE.to_string(),
        male_premium: None,
        female_premium: None,
        premium_range: range_requested.then(RangePatch::default),
        row_error: Some(failure_message(err)),
    }
}

/// Run the row lookups for `query` concurrently and merge the results
///
/// The availability check and the premium computation (plus the premium
/// range when `with_range`) are all awaited before the patch is built. Any
/// single failure turns the whole patch into a [`failure_patch`].
pub async fn fetch_patch(
    upstream: &dyn Upstream,
    query: &TermQuery,
    base_amount: u64,
    with_range: bool,
) -> RowPatch {
    let range = async {
        if with_range {
            upstream.premium_minmax(query).await.map(Some)
        } else {
            Ok(None)
        }
    };

    match futures::try_join!(
        upstream.data_check(query),
        upstream.premium_by_terms(query, base_amount),
        range,
    ) {
        Ok((check, premium, range)) => merge_patch(check, premium, range),
        Err(err) => {
            tracing::warn!(
                code = %query.code,
                insu_term = %query.insurance_term,
                pay_term = %query.payment_term,
                age = query.age,
                "row lookup failed: {err}"
            );
            failure_patch(&err, with_range)
        }
    }
}

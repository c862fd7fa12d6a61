//! Driver behaviour: propagation, ordering, failure patches, bounded fan-out
//!
//! Run with: cargo test --package insu-sync --test sync_driver

use insu_sync::merge::{AVAILABILITY_UNREACHABLE, SERVER_FAILURE, TRANSPORT_FAILURE};
use insu_sync::prelude::*;
use insu_sync::{DiscardReason, RangePatch, SyncError};
use insu_test_utils::{
    default_female_premium, default_male_premium, fixtures, Call, FakeUpstream,
};
use insu_upstream::{DataCheck, FetchError, PremiumByTerms, PremiumRange};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn selected(fake: &Arc<FakeUpstream>, config: SyncConfig) -> SyncContext {
    let ctx = SyncContext::with_config(fake.clone(), config).unwrap();
    let outcomes = ctx.select_primary_code("21686").await.settle().await;
    assert!(outcomes.iter().all(RefreshOutcome::is_applied));
    fake.clear_calls();
    ctx
}

async fn wait_for_in_flight(fake: &FakeUpstream, count: usize) {
    while fake.in_flight() < count {
        tokio::task::yield_now().await;
    }
}

async fn wait_for_call(fake: &FakeUpstream, call: &Call) {
    while !fake.calls().contains(call) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn set_age_issues_one_refresh_per_row() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::default()).await;
    let keys: Vec<RowKey> = ctx.rows().iter().map(|r| r.key().clone()).collect();

    let batch = ctx.set_age(30);
    assert_eq!(batch.len(), 3);
    let ticket_keys: Vec<RowKey> = batch.tickets().iter().map(|t| t.key.clone()).collect();
    assert_eq!(ticket_keys, keys);
    assert!(batch.tickets().iter().all(|t| t.params.age == 30));
    batch.settle().await;

    let checks = fake.data_checks();
    assert_eq!(checks.len(), 3);
    assert!(checks.iter().all(|q| q.age == 30));
    for key in &keys {
        assert_eq!(checks.iter().filter(|q| q.code == key.code
            && q.insurance_term == key.insurance_term
            && q.payment_term == key.payment_term).count(), 1);
    }
    assert_eq!(ctx.params().age, 30);
}

#[tokio::test]
async fn base_amount_flows_into_premiums() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::default()).await;

    ctx.set_base_amount(250).settle().await;

    let premiums = fake.premium_calls();
    assert_eq!(premiums.len(), 3);
    assert!(premiums.iter().all(|(_, base)| *base == 250));
    // full refresh, availability included
    assert_eq!(fake.data_checks().len(), 3);

    for row in ctx.rows() {
        assert_eq!(row.male_premium, Some(default_male_premium(15, 250)));
        assert_eq!(row.female_premium, Some(default_female_premium(15, 250)));
        assert_eq!(row.availability_summary.as_deref(), Some("준비금키 Y/준비금 Y/보험료 Y"));
    }
}

#[tokio::test]
async fn availability_summary_uses_exact_format() {
    let fake = Arc::new(fixtures::scenario_21686());
    fake.set_check(
        "21686",
        Ok(DataCheck {
            rsv_key: Some("Y".to_string()),
            rsv_rate: Some("N".to_string()),
            prem_rate: Some("Y".to_string()),
            errors: Vec::new(),
        }),
    );
    let ctx = SyncContext::new(fake.clone());
    ctx.select_primary_code("21686").await.settle().await;

    let rows = ctx.rows();
    assert_eq!(rows[0].availability_summary.as_deref(), Some("준비금키 Y/준비금 N/보험료 Y"));
    assert_eq!(rows[2].availability_summary.as_deref(), Some("준비금키 Y/준비금 Y/보험료 Y"));
}

#[tokio::test]
async fn late_patch_from_replaced_selection_is_discarded() {
    let fake = Arc::new(fixtures::with_second_primary(fixtures::scenario_21686()));
    let ctx = SyncContext::new(fake.clone());

    let gate = fake.hold_checks();
    let old = ctx.select_primary_code("21686").await.into_batch().unwrap();
    let new = ctx.select_primary_code("30000").await.into_batch().unwrap();
    gate.release();

    let old_outcomes = old.settle().await;
    assert_eq!(old_outcomes.len(), 3);
    assert!(old_outcomes
        .iter()
        .all(|o| matches!(o, RefreshOutcome::Discarded(_, DiscardReason::StaleSelection))));

    let new_outcomes = new.settle().await;
    assert!(new_outcomes.iter().all(RefreshOutcome::is_applied));

    let rows = ctx.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key(), &RowKey::new("30000", "종신", "전기납"));
    assert_eq!(rows[0].display_name, "종신보험");
    assert_eq!(rows[0].male_premium, Some(default_male_premium(15, 100)));
    assert_eq!(ctx.selection().selected_primary_code.as_deref(), Some("30000"));
    assert!(ctx.selection().related_codes.is_empty());
}

#[tokio::test]
async fn slow_expansion_is_superseded_by_newer_selection() {
    let fake = Arc::new(fixtures::with_second_primary(fixtures::scenario_21686()));
    let ctx = SyncContext::new(fake.clone());

    let gate = fake.hold_product("21686");
    let slow = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.select_primary_code("21686").await }
    });
    wait_for_call(&fake, &Call::Product("21686".to_string())).await;

    let fast = ctx.select_primary_code("30000").await.settle().await;
    assert_eq!(fast.len(), 1);
    assert!(fast.iter().all(RefreshOutcome::is_applied));
    let expected = ctx.rows();

    gate.release();
    let outcome = slow.await.unwrap();
    assert!(matches!(outcome, SelectionOutcome::Superseded));

    assert_eq!(ctx.rows(), expected);
    assert_eq!(expected[0].key(), &RowKey::new("30000", "종신", "전기납"));
    assert!(expected[0].is_patched());
    assert_eq!(ctx.selection().selected_primary_code.as_deref(), Some("30000"));
    assert!(ctx.selection().related_codes.is_empty());
    // the superseded expansion still ran to completion
    assert!(fake.calls().contains(&Call::RelatedCodes("21686".to_string())));
    assert!(ctx.error_log().is_empty());
}

#[tokio::test]
async fn most_recent_request_wins_over_late_response() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::default()).await;

    let gate = fake.hold_checks_for_age(20);
    let older = ctx.set_age(20);
    let newer = ctx.set_age(30);

    assert!(newer.settle().await.iter().all(RefreshOutcome::is_applied));
    gate.release();
    let late = older.settle().await;
    assert!(late
        .iter()
        .all(|o| matches!(o, RefreshOutcome::Discarded(_, DiscardReason::Superseded))));

    for row in ctx.rows() {
        assert_eq!(row.male_premium, Some(default_male_premium(30, 100)));
    }
}

#[tokio::test]
async fn refresh_is_idempotent() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::default()).await;

    ctx.refresh_all().settle().await;
    let first = ctx.rows();
    ctx.refresh_all().settle().await;
    let second = ctx.rows();

    assert_eq!(first, second);
    assert_eq!(fake.data_checks().len(), 6);
}

#[tokio::test]
async fn transport_failure_patches_only_its_row() {
    let fake = Arc::new(fixtures::scenario_21686());
    fake.set_check("21687", Err(FetchError::connect("connection refused")));
    let ctx = SyncContext::new(fake.clone());
    ctx.select_primary_code("21686").await.settle().await;

    let rows = ctx.rows();
    assert_eq!(rows.len(), 3);
    let failed = &rows[2];
    assert_eq!(failed.availability_summary.as_deref(), Some(AVAILABILITY_UNREACHABLE));
    assert_eq!(failed.row_error.as_deref(), Some(TRANSPORT_FAILURE));
    assert_eq!(failed.male_premium, None);
    assert_eq!(failed.female_premium, None);

    for row in &rows[..2] {
        assert_eq!(row.row_error, None);
        assert_eq!(row.male_premium, Some(default_male_premium(15, 100)));
    }
    // row-scoped failures stay out of the notification log
    assert!(ctx.error_log().is_empty());
}

#[tokio::test]
async fn server_and_generic_failures_are_classified() {
    let fake = Arc::new(fixtures::scenario_21686());
    fake.set_premium("21686", Err(FetchError::status(503, "GET /api/premium")));
    fake.set_check("21687", Err(FetchError::decode("expected value at line 1")));
    let ctx = SyncContext::new(fake.clone());
    ctx.select_primary_code("21686").await.settle().await;

    let rows = ctx.rows();
    assert_eq!(rows[0].row_error.as_deref(), Some(SERVER_FAILURE));
    assert_eq!(rows[1].row_error.as_deref(), Some(SERVER_FAILURE));
    let generic = rows[2].row_error.as_deref().unwrap();
    assert!(generic.starts_with("데이터 조회 실패: "));
}

#[tokio::test]
async fn backend_errors_and_zero_premium_are_kept() {
    let fake = Arc::new(fixtures::scenario_21686());
    fake.set_check(
        "21687",
        Ok(DataCheck {
            rsv_key: Some("Y".to_string()),
            errors: vec!["준비금 요율 누락".to_string()],
            ..DataCheck::default()
        }),
    );
    fake.set_premium(
        "21687",
        Ok(PremiumByTerms {
            man_premium: Some(0.0),
            fml_premium: None,
            errors: vec!["여성 요율 없음".to_string()],
        }),
    );
    let ctx = SyncContext::new(fake.clone());
    ctx.select_primary_code("21686").await.settle().await;

    let row = &ctx.rows()[2];
    assert_eq!(row.availability_summary.as_deref(), Some("준비금키 Y/준비금 N/보험료 N"));
    assert_eq!(row.row_error.as_deref(), Some("준비금 요율 누락, 여성 요율 없음"));
    assert_eq!(row.male_premium, Some(0.0));
    assert_eq!(row.female_premium, None);
}

#[tokio::test]
async fn premium_range_is_opt_in() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::default()).await;
    ctx.refresh_all().settle().await;
    assert!(fake.range_calls().is_empty());
    assert!(ctx.rows().iter().all(|r| r.min_premium_range.is_none()));

    let fake = Arc::new(fixtures::scenario_21686());
    fake.set_range(
        "21687",
        Ok(PremiumRange {
            man_min: Some(1_000.0),
            man_max: Some(9_000.0),
            ..PremiumRange::default()
        }),
    );
    let ctx = selected(&fake, SyncConfig::new().with_premium_range(true)).await;
    ctx.set_age(40).settle().await;

    assert_eq!(fake.range_calls().len(), 3);
    let rows = ctx.rows();
    assert_eq!(rows[0].min_premium_range, Some(400.0));
    assert_eq!(rows[0].max_premium_range, Some(4_000.0));
    assert_eq!(rows[2].min_premium_range, Some(1_000.0));
    assert_eq!(rows[2].max_premium_range, Some(9_000.0));
}

#[tokio::test]
async fn failed_range_refresh_clears_range() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::new().with_premium_range(true)).await;
    assert!(ctx.rows()[0].min_premium_range.is_some());

    fake.set_range("21686", Err(FetchError::timeout("deadline elapsed")));
    ctx.refresh_all().settle().await;

    let row = &ctx.rows()[0];
    assert_eq!(RangePatch { min: row.min_premium_range, max: row.max_premium_range }, RangePatch::default());
    assert_eq!(row.row_error.as_deref(), Some(TRANSPORT_FAILURE));
}

#[tokio::test]
async fn in_flight_refreshes_respect_the_limit() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::new().with_max_in_flight(1)).await;

    ctx.set_age(35).settle().await;
    ctx.set_base_amount(300).settle().await;

    assert_eq!(fake.peak_in_flight(), 1);
    assert!(ctx.rows().iter().all(|r| r.male_premium == Some(default_male_premium(35, 300))));
}

#[tokio::test]
async fn unbounded_refreshes_run_together() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = selected(&fake, SyncConfig::default()).await;

    let gate = fake.hold_checks();
    let batch = ctx.set_age(50);
    wait_for_in_flight(&fake, 3).await;
    gate.release();
    batch.settle().await;

    assert_eq!(fake.peak_in_flight(), 3);
}

#[tokio::test]
async fn selection_keeps_earlier_notifications() {
    let fake = Arc::new(fixtures::scenario_21686());
    let ctx = SyncContext::new(fake.clone());

    ctx.select_primary_code("00000").await.settle().await;
    ctx.select_primary_code("21686").await.settle().await;

    assert_eq!(ctx.error_log().len(), 1);
    assert_eq!(ctx.rows().len(), 3);
    ctx.error_log().clear();
    assert!(ctx.error_log().is_empty());
}

#[test]
fn invalid_config_is_rejected_before_any_fetch() {
    let config = AppConfig {
        sync: SyncConfig::new().with_max_in_flight(0),
        ..AppConfig::default()
    };
    assert!(matches!(SyncContext::from_config(&config), Err(SyncError::Config(_))));

    let fake = Arc::new(fixtures::scenario_21686());
    let direct = SyncContext::with_config(fake.clone(), SyncConfig::new().with_max_in_flight(0));
    assert!(matches!(direct, Err(SyncError::Config(_))));
    assert!(fake.calls().is_empty());

    let ctx = SyncContext::from_config(&AppConfig::default()).unwrap();
    assert_eq!(ctx.params(), SharedParameters::default());
    assert!(ctx.rows().is_empty());
}

//! Testing utilities for the insu workspace
//!
//! [`FakeUpstream`] is a scripted in-memory backend. Unscripted per-row
//! lookups answer with deterministic values derived from the query, every
//! call is recorded, and data checks or product lookups can be held behind
//! a [`Gate`] to force a particular completion order.

#![allow(missing_docs)]

use insu_upstream::{
    CodeEntry, CodeKind, ContractTerms, DataCheck, FetchError, FetchResult, LimitInfo, PdfFile,
    PolicyTerms, PremiumByTerms, PremiumRange, ProductDetail, RelatedCode, RelatedCodes,
    TermQuery, TermsField, Upstream,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One recorded upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPdfs,
    ListCodes { file: String, kind: CodeKind },
    Product(String),
    RelatedCodes(String),
    Limit { code: String, age: Option<u32> },
    DataCheck(TermQuery),
    PremiumMinmax(TermQuery),
    ProductDataCheck { code: String, age: Option<u32> },
    ProductPremiumMinmax { code: String, age: Option<u32> },
    PremiumByTerms(TermQuery, u64),
    ContractTerms(String),
}

/// Holds matching lookups until released
///
/// Dropping a gate without releasing it keeps the held lookups blocked.
#[derive(Debug, Clone)]
pub struct Gate {
    semaphore: Arc<Semaphore>,
}

impl Gate {
    /// Let every held and future matching lookup through
    pub fn release(&self) {
        self.semaphore.close();
    }
}

#[derive(Debug)]
enum GateTarget {
    /// Data checks, optionally only those for one age
    Checks(Option<u32>),
    /// Product detail lookups of one code
    Product(String),
}

#[derive(Debug)]
struct GateEntry {
    target: GateTarget,
    semaphore: Arc<Semaphore>,
}

/// Age the fake answers for when a lookup carries none
pub const FALLBACK_AGE: u32 = 15;

/// Default male premium: `age * base_amount`
#[must_use]
pub fn default_male_premium(age: u32, base_amount: u64) -> f64 {
    (u64::from(age) * base_amount) as f64
}

/// Default female premium: 80% of the male premium
#[must_use]
pub fn default_female_premium(age: u32, base_amount: u64) -> f64 {
    default_male_premium(age, base_amount) * 0.8
}

#[derive(Debug, Default)]
pub struct FakeUpstream {
    pdfs: Mutex<Option<FetchResult<Vec<PdfFile>>>>,
    codes: Mutex<HashMap<String, FetchResult<Vec<CodeEntry>>>>,
    products: Mutex<HashMap<String, FetchResult<ProductDetail>>>,
    related: Mutex<HashMap<String, FetchResult<RelatedCodes>>>,
    limits: Mutex<HashMap<String, FetchResult<LimitInfo>>>,
    checks: Mutex<HashMap<String, FetchResult<DataCheck>>>,
    ranges: Mutex<HashMap<String, FetchResult<PremiumRange>>>,
    premiums: Mutex<HashMap<String, FetchResult<PremiumByTerms>>>,
    contracts: Mutex<HashMap<String, FetchResult<ContractTerms>>>,
    calls: Mutex<Vec<Call>>,
    gates: Mutex<Vec<GateEntry>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeUpstream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pdfs(&self, result: FetchResult<Vec<PdfFile>>) {
        *self.pdfs.lock() = Some(result);
    }

    pub fn set_codes(&self, file: &str, result: FetchResult<Vec<CodeEntry>>) {
        self.codes.lock().insert(file.to_string(), result);
    }

    pub fn set_product(&self, code: &str, result: FetchResult<ProductDetail>) {
        self.products.lock().insert(code.to_string(), result);
    }

    pub fn set_related(&self, code: &str, result: FetchResult<RelatedCodes>) {
        self.related.lock().insert(code.to_string(), result);
    }

    pub fn set_limit(&self, code: &str, result: FetchResult<LimitInfo>) {
        self.limits.lock().insert(code.to_string(), result);
    }

    /// Script the data check of every row of `code`
    pub fn set_check(&self, code: &str, result: FetchResult<DataCheck>) {
        self.checks.lock().insert(code.to_string(), result);
    }

    /// Script the premium range of every row of `code`
    pub fn set_range(&self, code: &str, result: FetchResult<PremiumRange>) {
        self.ranges.lock().insert(code.to_string(), result);
    }

    /// Script the premium of every row of `code`
    pub fn set_premium(&self, code: &str, result: FetchResult<PremiumByTerms>) {
        self.premiums.lock().insert(code.to_string(), result);
    }

    pub fn set_contract_terms(&self, code: &str, result: FetchResult<ContractTerms>) {
        self.contracts.lock().insert(code.to_string(), result);
    }

    /// Hold every data check until the gate is released
    #[must_use]
    pub fn hold_checks(&self) -> Gate {
        self.install_gate(GateTarget::Checks(None))
    }

    /// Hold data checks issued for `age` until the gate is released
    #[must_use]
    pub fn hold_checks_for_age(&self, age: u32) -> Gate {
        self.install_gate(GateTarget::Checks(Some(age)))
    }

    /// Hold product detail lookups of `code` until the gate is released
    ///
    /// The lookup is recorded before it blocks.
    #[must_use]
    pub fn hold_product(&self, code: &str) -> Gate {
        self.install_gate(GateTarget::Product(code.to_string()))
    }

    fn install_gate(&self, target: GateTarget) -> Gate {
        let semaphore = Arc::new(Semaphore::new(0));
        self.gates.lock().push(GateEntry {
            target,
            semaphore: Arc::clone(&semaphore),
        });
        Gate { semaphore }
    }

    /// Every call in arrival order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Queries of every data check in arrival order
    #[must_use]
    pub fn data_checks(&self) -> Vec<TermQuery> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::DataCheck(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    /// Queries and base amounts of every premium computation
    #[must_use]
    pub fn premium_calls(&self) -> Vec<(TermQuery, u64)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::PremiumByTerms(q, base) => Some((q.clone(), *base)),
                _ => None,
            })
            .collect()
    }

    /// Queries of every premium range lookup
    #[must_use]
    pub fn range_calls(&self) -> Vec<TermQuery> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::PremiumMinmax(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Data checks currently running
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of data checks seen running at once
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight {
            counter: &self.in_flight,
        }
    }

    async fn pass_gates(&self, holds: impl Fn(&GateTarget) -> bool) {
        let held: Vec<Arc<Semaphore>> = self
            .gates
            .lock()
            .iter()
            .filter(|g| holds(&g.target))
            .map(|g| Arc::clone(&g.semaphore))
            .collect();
        for semaphore in held {
            // Closed on release; acquiring a closed semaphore returns at once.
            let _ = semaphore.acquire().await;
        }
    }
}

fn not_found(path: String) -> FetchError {
    FetchError::status(404, format!("GET {path}"))
}

fn all_available() -> DataCheck {
    DataCheck {
        rsv_key: Some("Y".to_string()),
        rsv_rate: Some("Y".to_string()),
        prem_rate: Some("Y".to_string()),
        errors: Vec::new(),
    }
}

/// Male range `age * 10 ..= age * 100`
fn default_range(age: u32) -> PremiumRange {
    PremiumRange {
        man_min: Some(f64::from(age) * 10.0),
        man_max: Some(f64::from(age) * 100.0),
        ..PremiumRange::default()
    }
}

fn scripted<T: Clone>(map: &Mutex<HashMap<String, FetchResult<T>>>, key: &str) -> Option<FetchResult<T>> {
    map.lock().get(key).cloned()
}

#[async_trait::async_trait]
impl Upstream for FakeUpstream {
    async fn list_pdfs(&self) -> FetchResult<Vec<PdfFile>> {
        self.record(Call::ListPdfs);
        self.pdfs.lock().clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_codes(&self, file: &str, kind: CodeKind) -> FetchResult<Vec<CodeEntry>> {
        self.record(Call::ListCodes {
            file: file.to_string(),
            kind,
        });
        scripted(&self.codes, file).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn product(&self, code: &str) -> FetchResult<ProductDetail> {
        self.record(Call::Product(code.to_string()));
        self.pass_gates(|target| matches!(target, GateTarget::Product(held) if held == code))
            .await;
        scripted(&self.products, code)
            .unwrap_or_else(|| Err(not_found(format!("/api/product/{code}"))))
    }

    async fn related_codes(&self, code: &str) -> FetchResult<RelatedCodes> {
        self.record(Call::RelatedCodes(code.to_string()));
        scripted(&self.related, code).unwrap_or_else(|| Ok(RelatedCodes::default()))
    }

    async fn limit(&self, code: &str, age: Option<u32>) -> FetchResult<LimitInfo> {
        self.record(Call::Limit {
            code: code.to_string(),
            age,
        });
        scripted(&self.limits, code).unwrap_or_else(|| Ok(LimitInfo::default()))
    }

    async fn data_check(&self, query: &TermQuery) -> FetchResult<DataCheck> {
        self.record(Call::DataCheck(query.clone()));
        let _in_flight = self.enter();
        self.pass_gates(|target| match target {
            GateTarget::Checks(age) => age.map_or(true, |a| a == query.age),
            GateTarget::Product(_) => false,
        })
        .await;
        tokio::task::yield_now().await;

        scripted(&self.checks, &query.code).unwrap_or_else(|| Ok(all_available()))
    }

    async fn premium_minmax(&self, query: &TermQuery) -> FetchResult<PremiumRange> {
        self.record(Call::PremiumMinmax(query.clone()));
        scripted(&self.ranges, &query.code).unwrap_or_else(|| Ok(default_range(query.age)))
    }

    async fn product_data_check(&self, code: &str, age: Option<u32>) -> FetchResult<DataCheck> {
        self.record(Call::ProductDataCheck {
            code: code.to_string(),
            age,
        });
        scripted(&self.checks, code).unwrap_or_else(|| Ok(all_available()))
    }

    async fn product_premium_minmax(
        &self,
        code: &str,
        age: Option<u32>,
    ) -> FetchResult<PremiumRange> {
        self.record(Call::ProductPremiumMinmax {
            code: code.to_string(),
            age,
        });
        scripted(&self.ranges, code)
            .unwrap_or_else(|| Ok(default_range(age.unwrap_or(FALLBACK_AGE))))
    }

    async fn premium_by_terms(
        &self,
        query: &TermQuery,
        base_amount: u64,
    ) -> FetchResult<PremiumByTerms> {
        self.record(Call::PremiumByTerms(query.clone(), base_amount));
        scripted(&self.premiums, &query.code).unwrap_or_else(|| {
            Ok(PremiumByTerms {
                man_premium: Some(default_male_premium(query.age, base_amount)),
                fml_premium: Some(default_female_premium(query.age, base_amount)),
                errors: Vec::new(),
            })
        })
    }

    async fn contract_terms(&self, code: &str) -> FetchResult<ContractTerms> {
        self.record(Call::ContractTerms(code.to_string()));
        scripted(&self.contracts, code).unwrap_or_else(|| Ok(ContractTerms::default()))
    }
}

/// Response builders
pub mod fixtures {
    use super::*;

    /// Product detail with one term object per `(insurance, payment)` pair
    #[must_use]
    pub fn product(code: &str, name: &str, combos: &[(&str, &str)]) -> ProductDetail {
        let terms = combos
            .iter()
            .map(|(insu, pay)| PolicyTerms {
                insu_term: Some((*insu).to_string()),
                pay_term: Some((*pay).to_string()),
                age_range: Some("15~60세".to_string()),
                ..PolicyTerms::default()
            })
            .collect();
        ProductDetail {
            code: code.to_string(),
            name: Some(name.to_string()),
            terms: Some(TermsField::Many(terms)),
            calc_available: Some(true),
            ..ProductDetail::default()
        }
    }

    /// Related-codes response listing `codes`
    #[must_use]
    pub fn related(main_code: &str, codes: &[&str]) -> RelatedCodes {
        RelatedCodes {
            main_code: Some(main_code.to_string()),
            related_codes: codes
                .iter()
                .map(|c| RelatedCode {
                    code: (*c).to_string(),
                    name: None,
                    main_code: Some(main_code.to_string()),
                })
                .collect(),
            error: None,
        }
    }

    /// Primary `21686` with two term combinations and secondary `21687` with one
    #[must_use]
    pub fn scenario_21686() -> FakeUpstream {
        let fake = FakeUpstream::new();
        fake.set_product(
            "21686",
            Ok(product(
                "21686",
                "무배당 암보험",
                &[("90세만기", "20년납"), ("100세만기", "20년납")],
            )),
        );
        fake.set_related("21686", Ok(related("21686", &["21687"])));
        fake.set_product(
            "21687",
            Ok(product("21687", "암진단특약", &[("90세만기", "20년납")])),
        );
        fake
    }

    /// A second primary `30000` with one combination and no secondaries
    #[must_use]
    pub fn with_second_primary(fake: FakeUpstream) -> FakeUpstream {
        fake.set_product(
            "30000",
            Ok(product("30000", "종신보험", &[("종신", "전기납")])),
        );
        fake
    }
}

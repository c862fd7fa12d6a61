//! Side panel: catalog browsing and single-product details
//!
//! These operations sit next to the row engine and share its context. None
//! of them touch the row refresh path except [`SyncContext::list_codes`],
//! which drops the current row set along with the selection.

use crate::driver::SyncContext;
use crate::row::UNNAMED_PRODUCT;
use insu_upstream::{CodeEntry, CodeKind, PdfFile, PolicyTerms};
use serde::Serialize;

/// Display name of a product whose detail failed to load
pub const PRODUCT_LOAD_FAILED: &str = "오류";

/// Product shown in the panel
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub code: String,
    pub name: String,
    pub terms: Vec<PolicyTerms>,
    pub calc_available: bool,
    pub message: Option<String>,
}

/// Coverage limit shown in the panel
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitSummary {
    pub min_won: Option<f64>,
    pub max_won: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub pdfs: Vec<PdfFile>,
    pub picked_pdf: Option<String>,
    pub codes: Vec<CodeEntry>,
    pub product: Option<ProductSummary>,
    pub limit: Option<LimitSummary>,
    pub contract_notes: Vec<String>,
}

fn won(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        amount.to_string()
    }
}

impl SyncContext {
    /// Snapshot of the side panel
    #[must_use]
    pub fn panel(&self) -> PanelState {
        self.inner.state.lock().panel.clone()
    }

    /// Fetch the catalog file list
    pub async fn list_pdfs(&self) {
        match self.inner.upstream.list_pdfs().await {
            Ok(pdfs) => {
                tracing::debug!(count = pdfs.len(), "catalog files listed");
                self.inner.state.lock().panel.pdfs = pdfs;
            }
            Err(err) => self.inner.errors.append(format!("PDF 목록 조회 실패: {err}")),
        }
    }

    /// Pick a catalog file and list its primary codes
    ///
    /// The row set and the selection are cleared as soon as the file is picked.
    pub async fn list_codes(&self, file: &str) {
        {
            let mut state = self.inner.state.lock();
            state.panel.picked_pdf = Some(file.to_string());
            state.selection.clear();
            state.store.begin_selection();
        }

        match self.inner.upstream.list_codes(file, CodeKind::Main).await {
            Ok(codes) => {
                if codes.is_empty() {
                    self.inner.errors.append(format!(
                        "주계약 코드 조회 실패: 파일 {file}에서 코드를 찾을 수 없습니다."
                    ));
                }
                tracing::info!(file, count = codes.len(), "primary codes listed");
                self.inner.state.lock().panel.codes = codes;
            }
            Err(err) => {
                self.inner
                    .errors
                    .append(format!("주계약 코드 조회 중 오류 발생: {err}"));
                self.inner.state.lock().panel.codes.clear();
            }
        }
    }

    /// Load one product's detail into the panel
    pub async fn load_product(&self, code: &str) {
        let product = match self.inner.upstream.product(code).await {
            Ok(detail) => {
                let terms = match (detail.term_combinations(), detail.single_terms()) {
                    (Some(many), _) => many.to_vec(),
                    (None, Some(one)) => vec![one.clone()],
                    (None, None) => Vec::new(),
                };
                ProductSummary {
                    code: if detail.code.is_empty() {
                        code.to_string()
                    } else {
                        detail.code
                    },
                    name: detail
                        .name
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
                    terms,
                    calc_available: detail.calc_available.unwrap_or(false),
                    message: detail.message,
                }
            }
            Err(err) => {
                tracing::warn!(code, "product detail failed: {err}");
                ProductSummary {
                    code: code.to_string(),
                    name: PRODUCT_LOAD_FAILED.to_string(),
                    message: Some(format!("상품 정보 로드 실패: {err}")),
                    ..ProductSummary::default()
                }
            }
        };
        self.inner.state.lock().panel.product = Some(product);
    }

    /// Load a product's coverage limit into the panel
    pub async fn load_limit(&self, code: &str, age: Option<u32>) {
        let limit = match self.inner.upstream.limit(code, age).await {
            Ok(info) => LimitSummary {
                min_won: info.min_won,
                max_won: info.max_won,
                message: info.message,
            },
            Err(err) => LimitSummary {
                message: Some(format!("한도 정보 로드 실패: {err}")),
                ..LimitSummary::default()
            },
        };
        self.inner.state.lock().panel.limit = Some(limit);
    }

    /// Check a product's data availability, logging every reported problem
    ///
    /// Only `age` is sent; the backend picks its own terms.
    pub async fn check_data_availability(&self, code: &str, age: Option<u32>) {
        match self.inner.upstream.product_data_check(code, age).await {
            Ok(check) => {
                for error in check.errors {
                    self.inner.errors.append(format!("{code}: {error}"));
                }
            }
            Err(err) => self.inner.errors.append(format!("데이터 검증 실패: {err}")),
        }
    }

    /// Load a product's min/max premium into the panel limit
    pub async fn load_minmax_premium(&self, code: &str, age: Option<u32>) {
        let range = match self.inner.upstream.product_premium_minmax(code, age).await {
            Ok(range) => range,
            Err(err) => {
                self.inner
                    .errors
                    .append(format!("MIN/MAX 보험료 계산 실패: {err}"));
                return;
            }
        };

        if !range.errors.is_empty() {
            for error in range.errors {
                self.inner.errors.append(format!("{code}: {error}"));
            }
            return;
        }

        if let (Some(min), Some(max)) = (range.man_min, range.man_max) {
            let mut state = self.inner.state.lock();
            let limit = state.panel.limit.get_or_insert_with(LimitSummary::default);
            limit.min_won = Some(min);
            limit.max_won = Some(max);
            limit.message = Some(format!("MIN: {}원, MAX: {}원", won(min), won(max)));
        }
    }

    /// Load a product's contract condition notes into the panel
    pub async fn load_contract_terms(&self, code: &str) {
        match self.inner.upstream.contract_terms(code).await {
            Ok(terms) => self.inner.state.lock().panel.contract_notes = terms.notes,
            Err(err) => self
                .inner
                .errors
                .append(format!("계약조건설명 로드 실패: {err}")),
        }
    }

    /// Discover related codes without rebuilding the row set
    pub async fn load_related_codes(&self, code: &str) {
        match self.inner.upstream.related_codes(code).await {
            Ok(related) => {
                let mut state = self.inner.state.lock();
                state.selection.related_codes = related.related_codes;
                state.selection.selected_primary_code = Some(code.to_string());
            }
            Err(err) => self.inner.errors.append(format!("관련 코드 조회 실패: {err}")),
        }
    }
}

//! The lookup seam between the comparison engine and the backend
//!
//! Implement [`Upstream`] to plug a different transport (or a test double)
//! under the engine. Every method is a single read-only attempt.

use crate::error::FetchError;
use crate::types::{
    CodeEntry, CodeKind, ContractTerms, DataCheck, LimitInfo, PdfFile, PremiumByTerms,
    PremiumRange, ProductDetail, RelatedCodes, TermQuery,
};

/// Result alias for lookups
pub type FetchResult<T> = Result<T, FetchError>;

/// Read-only product backend
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// `GET /api/pdf/list`
    async fn list_pdfs(&self) -> FetchResult<Vec<PdfFile>>;

    /// `GET /api/pdf/codes?file=&type=`
    async fn list_codes(&self, file: &str, kind: CodeKind) -> FetchResult<Vec<CodeEntry>>;

    /// `GET /api/product/{code}`
    async fn product(&self, code: &str) -> FetchResult<ProductDetail>;

    /// `GET /api/product/{code}/related-codes`
    async fn related_codes(&self, code: &str) -> FetchResult<RelatedCodes>;

    /// `GET /api/limit/{code}?age=`
    async fn limit(&self, code: &str, age: Option<u32>) -> FetchResult<LimitInfo>;

    /// `GET /api/data/check/{code}?age=&insuTerm=&payTerm=`
    async fn data_check(&self, query: &TermQuery) -> FetchResult<DataCheck>;

    /// `GET /api/premium/minmax/{code}?age=&insuTerm=&payTerm=`
    async fn premium_minmax(&self, query: &TermQuery) -> FetchResult<PremiumRange>;

    /// `GET /api/data/check/{code}?age=` without terms, as the detail panel asks
    async fn product_data_check(&self, code: &str, age: Option<u32>) -> FetchResult<DataCheck>;

    /// `GET /api/premium/minmax/{code}?age=` without terms
    async fn product_premium_minmax(
        &self,
        code: &str,
        age: Option<u32>,
    ) -> FetchResult<PremiumRange>;

    /// `GET /api/premium/calculate-by-terms/{code}?age=&insuTerm=&payTerm=&baseAmount=`
    async fn premium_by_terms(
        &self,
        query: &TermQuery,
        base_amount: u64,
    ) -> FetchResult<PremiumByTerms>;

    /// `GET /api/contract/terms/{code}`
    async fn contract_terms(&self, code: &str) -> FetchResult<ContractTerms>;
}

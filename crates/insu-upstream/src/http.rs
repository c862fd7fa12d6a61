//! `reqwest`-backed [`Upstream`] implementation

use crate::client::{FetchResult, Upstream};
use crate::error::FetchError;
use crate::types::{
    CodeEntry, CodeKind, ContractTerms, DataCheck, LimitInfo, PdfFile, PremiumByTerms,
    PremiumRange, ProductDetail, RelatedCodes, TermQuery,
};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the backend, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl UpstreamConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 10_000,
            user_agent: concat!("insu-compare/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP client for the product backend
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    base: Url,
}

impl HttpUpstream {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns `FetchError` if the base URL is invalid or the client cannot be built
    pub fn new(config: &UpstreamConfig) -> FetchResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| FetchError::other(format!("invalid base url {}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::other(format!(
                "base url cannot carry paths: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, base })
    }

    /// Base URL requests are resolved against
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `segments` and `query` against the base URL
    pub(crate) fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> FetchResult<T> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, %status, "non-success response");
            return Err(FetchError::status(status.as_u16(), format!("GET {url}")));
        }

        Ok(response.json::<T>().await?)
    }
}

fn age_param(age: Option<u32>) -> Vec<(&'static str, String)> {
    age.map(|a| ("age", a.to_string())).into_iter().collect()
}

fn term_params(query: &TermQuery) -> Vec<(&'static str, String)> {
    vec![
        ("age", query.age.to_string()),
        ("insuTerm", query.insurance_term.clone()),
        ("payTerm", query.payment_term.clone()),
    ]
}

#[async_trait::async_trait]
impl Upstream for HttpUpstream {
    async fn list_pdfs(&self) -> FetchResult<Vec<PdfFile>> {
        self.get_json(self.endpoint(&["api", "pdf", "list"], &[])).await
    }

    async fn list_codes(&self, file: &str, kind: CodeKind) -> FetchResult<Vec<CodeEntry>> {
        let url = self.endpoint(
            &["api", "pdf", "codes"],
            &[("file", file.to_string()), ("type", kind.as_str().to_string())],
        );
        self.get_json(url).await
    }

    async fn product(&self, code: &str) -> FetchResult<ProductDetail> {
        self.get_json(self.endpoint(&["api", "product", code], &[])).await
    }

    async fn related_codes(&self, code: &str) -> FetchResult<RelatedCodes> {
        self.get_json(self.endpoint(&["api", "product", code, "related-codes"], &[]))
            .await
    }

    async fn limit(&self, code: &str, age: Option<u32>) -> FetchResult<LimitInfo> {
        self.get_json(self.endpoint(&["api", "limit", code], &age_param(age)))
            .await
    }

    async fn data_check(&self, query: &TermQuery) -> FetchResult<DataCheck> {
        let url = self.endpoint(&["api", "data", "check", &query.code], &term_params(query));
        self.get_json(url).await
    }

    async fn premium_minmax(&self, query: &TermQuery) -> FetchResult<PremiumRange> {
        let url = self.endpoint(
            &["api", "premium", "minmax", &query.code],
            &term_params(query),
        );
        self.get_json(url).await
    }

    async fn product_data_check(&self, code: &str, age: Option<u32>) -> FetchResult<DataCheck> {
        self.get_json(self.endpoint(&["api", "data", "check", code], &age_param(age)))
            .await
    }

    async fn product_premium_minmax(
        &self,
        code: &str,
        age: Option<u32>,
    ) -> FetchResult<PremiumRange> {
        self.get_json(self.endpoint(&["api", "premium", "minmax", code], &age_param(age)))
            .await
    }

    async fn premium_by_terms(
        &self,
        query: &TermQuery,
        base_amount: u64,
    ) -> FetchResult<PremiumByTerms> {
        let mut params = term_params(query);
        params.push(("baseAmount", base_amount.to_string()));
        let url = self.endpoint(
            &["api", "premium", "calculate-by-terms", &query.code],
            &params,
        );
        self.get_json(url).await
    }

    async fn contract_terms(&self, code: &str) -> FetchResult<ContractTerms> {
        self.get_json(self.endpoint(&["api", "contract", "terms", code], &[]))
            .await
    }
}

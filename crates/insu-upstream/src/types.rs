//! Wire types for the product backend
//!
//! All response shapes are decoded defensively: missing or `null` fields fall
//! back to `None` / empty collections instead of failing the whole lookup.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which codes of a catalog file to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    /// Only primary (main contract) codes
    #[default]
    Main,
    /// Every code in the file, riders included
    Rider,
}

impl CodeKind {
    /// Query parameter value
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::Main => "main",
            CodeKind::Rider => "rider",
        }
    }
}

/// Catalog file descriptor (`GET /api/pdf/list`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfFile {
    pub name: String,
    pub size: u64,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub mtime: Option<DateTime<Utc>>,
}

/// Product code with its display name (`GET /api/pdf/codes`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeEntry {
    #[serde(rename = "insuCd", alias = "code")]
    pub code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// One (insurance-term, payment-term) combination of a product
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyTerms {
    pub insu_term: Option<String>,
    pub pay_term: Option<String>,
    pub age_range: Option<String>,
    pub renew: Option<String>,
    pub special_notes: Option<String>,
}

/// `terms` is either a single object (older backends) or an array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermsField {
    Many(Vec<PolicyTerms>),
    One(PolicyTerms),
}

/// Product detail (`GET /api/product/{code}`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(rename = "insuCd", alias = "code")]
    pub code: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub terms: Option<TermsField>,
    pub calc_available: Option<bool>,
    pub message: Option<String>,
}

impl ProductDetail {
    /// Term combinations when the detail exposes a non-empty list of them
    #[must_use]
    pub fn term_combinations(&self) -> Option<&[PolicyTerms]> {
        match &self.terms {
            Some(TermsField::Many(list)) if !list.is_empty() => Some(list),
            _ => None,
        }
    }

    /// Best-effort single term object
    #[must_use]
    pub fn single_terms(&self) -> Option<&PolicyTerms> {
        match &self.terms {
            Some(TermsField::One(terms)) => Some(terms),
            Some(TermsField::Many(list)) => list.first(),
            None => None,
        }
    }
}

/// Secondary code discovered from a primary code
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelatedCode {
    #[serde(rename = "insuCd", alias = "code")]
    pub code: String,
    pub name: Option<String>,
    pub main_code: Option<String>,
}

/// `GET /api/product/{code}/related-codes`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelatedCodes {
    pub main_code: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub related_codes: Vec<RelatedCode>,
    /// Set by the backend when discovery failed on its side
    pub error: Option<String>,
}

/// Coverage limit (`GET /api/limit/{code}`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitInfo {
    #[serde(deserialize_with = "lenient_amount")]
    pub min_won: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    pub max_won: Option<f64>,
    pub display: Option<String>,
    pub message: Option<String>,
}

/// Data availability check (`GET /api/data/check/{code}`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataCheck {
    pub rsv_key: Option<String>,
    pub rsv_rate: Option<String>,
    pub prem_rate: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

impl DataCheck {
    /// Reserve key present
    #[inline]
    #[must_use]
    pub fn has_rsv_key(&self) -> bool {
        is_yes(self.rsv_key.as_deref())
    }

    /// Reserve rate present
    #[inline]
    #[must_use]
    pub fn has_rsv_rate(&self) -> bool {
        is_yes(self.rsv_rate.as_deref())
    }

    /// Premium rate present
    #[inline]
    #[must_use]
    pub fn has_prem_rate(&self) -> bool {
        is_yes(self.prem_rate.as_deref())
    }
}

/// Min/max premium (`GET /api/premium/minmax/{code}`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PremiumRange {
    #[serde(deserialize_with = "lenient_amount")]
    pub man_min: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    pub man_max: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    pub fml_min: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    pub fml_max: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

/// Premium for explicit terms (`GET /api/premium/calculate-by-terms/{code}`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PremiumByTerms {
    #[serde(deserialize_with = "lenient_amount")]
    pub man_premium: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    pub fml_premium: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

/// Contract condition notes (`GET /api/contract/terms/{code}`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContractTerms {
    pub insu_cd: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: Vec<String>,
}

/// Key of a per-row lookup: code, age and the row's term fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermQuery {
    pub code: String,
    pub age: u32,
    pub insurance_term: String,
    pub payment_term: String,
}

impl TermQuery {
    /// Create a new term query
    #[inline]
    pub fn new(
        code: impl Into<String>,
        age: u32,
        insurance_term: impl Into<String>,
        payment_term: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            age,
            insurance_term: insurance_term.into(),
            payment_term: payment_term.into(),
        }
    }
}

fn is_yes(flag: Option<&str>) -> bool {
    flag.is_some_and(|f| f.trim().eq_ignore_ascii_case("Y"))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts a JSON number or a numeric string; anything else is `None`
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

/// Accepts epoch milliseconds or an RFC 3339 string
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn product_with_term_array() {
        let json = r#"{
            "insuCd": "21686",
            "name": "(무)다사랑암보험",
            "terms": [
                {"insuTerm": "90세만기", "payTerm": "10년납", "ageRange": "15~80"},
                {"insuTerm": "100세만기", "payTerm": "20년납"}
            ],
            "calcAvailable": true
        }"#;
        let product: ProductDetail = serde_json::from_str(json).unwrap();

        assert_eq!(product.code, "21686");
        let combos = product.term_combinations().unwrap();
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[1].insu_term.as_deref(), Some("100세만기"));
        assert_eq!(combos[1].age_range, None);
    }

    #[test]
    fn product_with_single_terms_object() {
        let json = r#"{"insuCd": "79525", "terms": {"insuTerm": "90세만기"}}"#;
        let product: ProductDetail = serde_json::from_str(json).unwrap();

        assert!(product.term_combinations().is_none());
        let terms = product.single_terms().unwrap();
        assert_eq!(terms.insu_term.as_deref(), Some("90세만기"));
        assert_eq!(terms.pay_term, None);
    }

    #[test]
    fn product_with_empty_or_null_terms() {
        let empty: ProductDetail = serde_json::from_str(r#"{"terms": []}"#).unwrap();
        assert!(empty.term_combinations().is_none());
        assert!(empty.single_terms().is_none());

        let null: ProductDetail = serde_json::from_str(r#"{"terms": null, "name": null}"#).unwrap();
        assert!(null.terms.is_none());
        assert!(null.name.is_none());
    }

    #[test]
    fn related_codes_accept_either_code_field() {
        let json = r#"{"mainCode": "21686", "relatedCodes": [{"insuCd": "21687"}, {"code": "79525", "name": "특약"}]}"#;
        let related: RelatedCodes = serde_json::from_str(json).unwrap();

        let codes: Vec<&str> = related.related_codes.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["21687", "79525"]);
    }

    #[test]
    fn related_codes_null_list_is_empty() {
        let related: RelatedCodes =
            serde_json::from_str(r#"{"relatedCodes": null, "error": "관련 코드 조회 실패"}"#).unwrap();
        assert!(related.related_codes.is_empty());
        assert!(related.error.is_some());
    }

    #[test]
    fn data_check_flags() {
        let check: DataCheck =
            serde_json::from_str(r#"{"rsvKey": "Y", "rsvRate": "N", "errors": null}"#).unwrap();

        assert!(check.has_rsv_key());
        assert!(!check.has_rsv_rate());
        assert!(!check.has_prem_rate());
        assert!(check.errors.is_empty());
    }

    #[test]
    fn amounts_are_lenient() {
        let premium: PremiumByTerms = serde_json::from_str(
            r#"{"manPremium": 12345.5, "fmlPremium": "9,870", "errors": ["요율 없음"]}"#,
        )
        .unwrap();
        assert_eq!(premium.man_premium, Some(12345.5));
        assert_eq!(premium.fml_premium, Some(9870.0));
        assert_eq!(premium.errors, vec!["요율 없음".to_string()]);

        let odd: PremiumByTerms =
            serde_json::from_str(r#"{"manPremium": true, "fmlPremium": null}"#).unwrap();
        assert_eq!(odd.man_premium, None);
        assert_eq!(odd.fml_premium, None);
    }

    #[test]
    fn pdf_mtime_formats() {
        let files: Vec<PdfFile> = serde_json::from_str(
            r#"[{"name": "a.pdf", "size": 10, "mtime": 1700000000000},
                {"name": "b.pdf", "mtime": "2024-01-02T03:04:05+09:00"},
                {"name": "c.pdf", "mtime": null}]"#,
        )
        .unwrap();

        assert_eq!(files[0].mtime.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(files[1].mtime.unwrap().timestamp(), 1_704_132_245);
        assert_eq!(files[1].size, 0);
        assert!(files[2].mtime.is_none());
    }
}

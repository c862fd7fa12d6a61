//! Plain-text rendering of rows and the panel

use insu_sync::{PanelState, Row};
use std::fmt::Write;

const EMPTY: &str = "-";

/// `12345.6` -> `"12,346"`
pub(crate) fn won(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn amount(value: Option<f64>) -> String {
    value.map_or_else(|| EMPTY.to_string(), won)
}

pub(crate) fn rows_table(rows: &[Row]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "구분 | 코드 | 상품명 | 보험기간 | 납입기간 | 가입나이 | 데이터 | 남자 | 여자 | 최소 | 최대 | 오류"
    );
    for row in rows {
        let key = row.key();
        let _ = writeln!(
            out,
            "{} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {}",
            row.role(),
            key.code,
            row.display_name,
            key.insurance_term,
            key.payment_term,
            row.age_range,
            row.availability_summary.as_deref().unwrap_or(EMPTY),
            amount(row.male_premium),
            amount(row.female_premium),
            amount(row.min_premium_range),
            amount(row.max_premium_range),
            row.row_error.as_deref().unwrap_or(""),
        );
    }
    out
}

pub(crate) fn panel_text(panel: &PanelState) -> String {
    let mut out = String::new();
    if let Some(product) = &panel.product {
        let _ = writeln!(out, "상품: {} ({})", product.name, product.code);
        let _ = writeln!(out, "계산 가능: {}", if product.calc_available { "Y" } else { "N" });
        for terms in &product.terms {
            let _ = writeln!(
                out,
                "  {} / {} / {}",
                terms.insu_term.as_deref().unwrap_or(EMPTY),
                terms.pay_term.as_deref().unwrap_or(EMPTY),
                terms.age_range.as_deref().unwrap_or(EMPTY),
            );
        }
        if let Some(message) = &product.message {
            let _ = writeln!(out, "  {message}");
        }
    }
    if let Some(limit) = &panel.limit {
        let _ = writeln!(
            out,
            "한도: {} ~ {}",
            amount(limit.min_won),
            amount(limit.max_won)
        );
        if let Some(message) = &limit.message {
            let _ = writeln!(out, "  {message}");
        }
    }
    if !panel.contract_notes.is_empty() {
        let _ = writeln!(out, "계약조건:");
        for note in &panel.contract_notes {
            let _ = writeln!(out, "  - {note}");
        }
    }
    out
}

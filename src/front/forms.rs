use std::str::FromStr;

use axum::extract::{rejection::QueryRejection, Query};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    calendar::DateRange,
    error::{AppError, AppResult},
    models::{ExpensePatch, IncomePatch, MealStatus, NewExpense, NewIncome, NewMealProvider},
};

/// Largest amount a `NUMERIC(14,2)` column holds, in cents.
const MAX_AMOUNT_CENTS: i64 = 99_999_999_999_999;

/// Parses `1.250.000`, `1.250`, `Rp 1.250.000,50` or a plain `1250000.50`.
///
/// Only digits, `.`, `,` and a leading `-` are accepted. At most two
/// decimal places, and no more than `NUMERIC(14,2)` can store.
pub fn parse_amount(raw: &str) -> AppResult<BigDecimal> {
    let mut cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(rest) = cleaned
        .strip_prefix("Rp")
        .or_else(|| cleaned.strip_prefix("rp"))
    {
        cleaned = rest.to_string();
    }
    if cleaned.is_empty() {
        return Err(AppError::validation("amount is required"));
    }

    let not_an_amount = || AppError::validation(format!("'{raw}' is not an amount"));
    let unsigned = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    if unsigned.is_empty()
        || !unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return Err(not_an_amount());
    }

    // a lone `.` before exactly three digits groups thousands
    let dot_groups = match cleaned.split_once('.') {
        Some((_, tail)) => tail.contains('.') || tail.len() == 3,
        None => false,
    };
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if dot_groups {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    let amount = BigDecimal::from_str(&normalized).map_err(|_| not_an_amount())?;
    if amount.as_bigint_and_exponent().1 > 2 {
        return Err(AppError::validation(format!(
            "'{raw}' has more than two decimal places"
        )));
    }
    if amount.abs() > BigDecimal::new(MAX_AMOUNT_CENTS.into(), 2) {
        return Err(AppError::validation(format!("'{raw}' is too large")));
    }
    Ok(amount)
}

pub fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("{field} '{raw}' is not a YYYY-MM-DD date")))
}

/// Unwraps a query string extractor, turning a malformed query into a
/// Validation error so it renders through the error page.
pub fn query<T>(q: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    q.map(|Query(v)| v)
        .map_err(|err| AppError::validation(err.body_text()))
}

/// Blank form fields are absent.
pub fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Both ends or neither.
pub fn parse_range(start: Option<String>, end: Option<String>) -> AppResult<Option<DateRange>> {
    match (non_empty(start), non_empty(end)) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some(DateRange::new(
            parse_date("start", &start)?,
            parse_date("end", &end)?,
        )?)),
        _ => Err(AppError::validation(
            "a date range needs both a start and an end",
        )),
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct IncomeForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub category: String,
    pub note: Option<String>,
}

impl IncomeForm {
    pub fn into_new(self) -> AppResult<NewIncome> {
        Ok(NewIncome {
            date: parse_date("date", &self.date)?,
            source: self.source.trim().to_string(),
            amount: parse_amount(&self.amount)?,
            category: self.category.trim().to_string(),
            note: non_empty(self.note),
        })
    }

    pub fn into_patch(self) -> AppResult<IncomePatch> {
        let fields = self.into_new()?;
        Ok(IncomePatch {
            date: Some(fields.date),
            source: Some(fields.source),
            amount: Some(fields.amount),
            category: Some(fields.category),
            note: Some(fields.note),
        })
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct ExpenseForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub category: String,
    pub note: Option<String>,
}

impl ExpenseForm {
    pub fn into_new(self) -> AppResult<NewExpense> {
        Ok(NewExpense {
            date: parse_date("date", &self.date)?,
            purpose: self.purpose.trim().to_string(),
            amount: parse_amount(&self.amount)?,
            category: self.category.trim().to_string(),
            note: non_empty(self.note),
        })
    }

    pub fn into_patch(self) -> AppResult<ExpensePatch> {
        let fields = self.into_new()?;
        Ok(ExpensePatch {
            date: Some(fields.date),
            purpose: Some(fields.purpose),
            amount: Some(fields.amount),
            category: Some(fields.category),
            note: Some(fields.note),
        })
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct MealProviderForm {
    #[serde(default)]
    pub provider_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub date: String,
    pub note: Option<String>,
}

impl MealProviderForm {
    pub fn into_new(self) -> AppResult<NewMealProvider> {
        Ok(NewMealProvider {
            provider_name: self.provider_name.trim().to_string(),
            address: non_empty(self.address),
            phone: non_empty(self.phone),
            date: parse_date("date", &self.date)?,
            note: non_empty(self.note),
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

impl StatusForm {
    pub fn status(&self) -> AppResult<MealStatus> {
        self.status.parse()
    }
}

/// One `<option>` of a `<select>`.
#[derive(Serialize, Debug, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

pub fn options(values: &[&str], selected: Option<&str>) -> Vec<SelectOption> {
    values
        .iter()
        .map(|v| SelectOption {
            value: v.to_string(),
            selected: Some(*v) == selected,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_indonesian_notation() {
        assert_eq!(parse_amount("1.250.000").unwrap(), BigDecimal::from(1_250_000));
        assert_eq!(
            parse_amount("Rp 1.250.000,50").unwrap(),
            BigDecimal::from_str("1250000.50").unwrap()
        );
        assert_eq!(parse_amount(" 150000 ").unwrap(), BigDecimal::from(150_000));
        assert_eq!(
            parse_amount("150000.5").unwrap(),
            BigDecimal::from_str("150000.5").unwrap()
        );
    }

    #[test]
    fn amount_rejects_garbage() {
        assert!(matches!(parse_amount(""), Err(AppError::Validation(_))));
        assert!(matches!(parse_amount("seratus"), Err(AppError::Validation(_))));
        assert!(matches!(parse_amount("-"), Err(AppError::Validation(_))));
    }

    #[test]
    fn amount_rejects_exponent_notation() {
        for raw in ["1e3", "5e20", "1e200000", "1E3", "2.5e2"] {
            assert!(
                matches!(parse_amount(raw), Err(AppError::Validation(_))),
                "{raw} was accepted"
            );
        }
    }

    #[test]
    fn amount_is_bounded_by_column_size() {
        assert!(matches!(
            parse_amount("123456789012345"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            parse_amount("-123456789012345"),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            parse_amount("999.999.999.999,99").unwrap(),
            BigDecimal::from_str("999999999999.99").unwrap()
        );
    }

    #[test]
    fn amount_rejects_sub_cent_precision() {
        assert!(matches!(parse_amount("10,125"), Err(AppError::Validation(_))));
        assert!(matches!(parse_amount("0.0001"), Err(AppError::Validation(_))));
    }

    #[test]
    fn single_dot_before_three_digits_groups_thousands() {
        assert_eq!(parse_amount("1.250").unwrap(), BigDecimal::from(1250));
        assert_eq!(parse_amount("Rp 25.000").unwrap(), BigDecimal::from(25_000));
        assert_eq!(
            parse_amount("1.25").unwrap(),
            BigDecimal::from_str("1.25").unwrap()
        );
    }

    #[test]
    fn negative_amount_parses_and_is_left_to_validation() {
        let form = IncomeForm {
            date: "2026-02-19".into(),
            source: "Jamaah".into(),
            amount: "-5000".into(),
            category: "infaq".into(),
            note: Some("  ".into()),
        };
        let fields = form.into_new().unwrap();
        assert_eq!(fields.amount, BigDecimal::from(-5000));
        assert_eq!(fields.note, None);
        assert!(fields.validate().is_err());
    }

    #[test]
    fn half_open_range_is_rejected() {
        assert!(parse_range(None, None).unwrap().is_none());
        assert!(parse_range(Some("".into()), Some(" ".into())).unwrap().is_none());
        assert!(matches!(
            parse_range(Some("2026-02-01".into()), None),
            Err(AppError::Validation(_))
        ));
        let range = parse_range(Some("2026-02-01".into()), Some("2026-02-28".into()))
            .unwrap()
            .unwrap();
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn bad_date_names_the_field() {
        let err = parse_date("date", "19/02/2026").unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn options_mark_selection() {
        let opts = options(&["infaq", "zakat"], Some("zakat"));
        assert!(!opts[0].selected);
        assert!(opts[1].selected);
    }
}

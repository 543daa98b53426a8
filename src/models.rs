use std::{fmt, str::FromStr};

use bigdecimal::{BigDecimal, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::types::{
    chrono::{DateTime, NaiveDate, Utc},
    Uuid,
};

use crate::error::{AppError, AppResult};

pub const INCOME_CATEGORIES: &[&str] = &[
    "infaq", "sedekah", "zakat", "donasi", "tarwih", "lainnya",
];

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "operasional",
    "pemeliharaan",
    "kegiatan",
    "konsumsi",
    "sosial",
    "lainnya",
];

/// Addresses offered by the meal-provider form. Free text is accepted too.
pub const PROVIDER_ADDRESSES: &[&str] = &["Rawamakmur", "Luar Rawamakmur"];

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+62|62|0)8[1-9][0-9]{6,9}$").expect("phone pattern is valid"));

/// Records that sit on a calendar date.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// Records that can be grouped and summed by category.
pub trait Categorized: Dated {
    fn category(&self) -> &str;
    fn amount(&self) -> &BigDecimal;
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct IncomeRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub source: String,
    pub amount: BigDecimal,
    pub category: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub purpose: String,
    pub amount: BigDecimal,
    pub category: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct MealProviderRecord {
    pub id: Uuid,
    pub provider_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: MealStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealStatus {
    Pending,
    Confirmed,
}

impl MealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealStatus::Pending => "pending",
            MealStatus::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for MealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(MealStatus::Pending),
            "confirmed" => Ok(MealStatus::Confirmed),
            other => Err(AppError::validation(format!("unknown status '{other}'"))),
        }
    }
}

impl TryFrom<String> for MealStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Dated for IncomeRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Categorized for IncomeRecord {
    fn category(&self) -> &str {
        &self.category
    }
    fn amount(&self) -> &BigDecimal {
        &self.amount
    }
}

impl Dated for ExpenseRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Categorized for ExpenseRecord {
    fn category(&self) -> &str {
        &self.category
    }
    fn amount(&self) -> &BigDecimal {
        &self.amount
    }
}

impl Dated for MealProviderRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Debug, Clone)]
pub struct NewIncome {
    pub date: NaiveDate,
    pub source: String,
    pub amount: BigDecimal,
    pub category: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub purpose: String,
    pub amount: BigDecimal,
    pub category: String,
    pub note: Option<String>,
}

/// A new schedule entry always starts out as [`MealStatus::Pending`].
#[derive(Debug, Clone)]
pub struct NewMealProvider {
    pub provider_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched. For the
/// optional columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct IncomePatch {
    pub date: Option<NaiveDate>,
    pub source: Option<String>,
    pub amount: Option<BigDecimal>,
    pub category: Option<String>,
    pub note: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub date: Option<NaiveDate>,
    pub purpose: Option<String>,
    pub amount: Option<BigDecimal>,
    pub category: Option<String>,
    pub note: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MealProviderPatch {
    pub provider_name: Option<String>,
    pub address: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub note: Option<Option<String>>,
    pub status: Option<MealStatus>,
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_non_negative(amount: &BigDecimal) -> AppResult<()> {
    if amount < &BigDecimal::zero() {
        return Err(AppError::validation("amount must not be negative"));
    }
    Ok(())
}

/// Indonesian mobile numbers: `08…`, `628…` or `+628…`, spaces ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&compact)
}

fn require_phone(phone: Option<&str>) -> AppResult<()> {
    match phone {
        Some(p) if !is_valid_phone(p) => Err(AppError::validation(format!(
            "'{p}' is not a valid phone number"
        ))),
        _ => Ok(()),
    }
}

impl NewIncome {
    pub fn validate(&self) -> AppResult<()> {
        require_text("source", &self.source)?;
        require_text("category", &self.category)?;
        require_non_negative(&self.amount)
    }
}

impl NewExpense {
    pub fn validate(&self) -> AppResult<()> {
        require_text("purpose", &self.purpose)?;
        require_text("category", &self.category)?;
        require_non_negative(&self.amount)
    }
}

impl NewMealProvider {
    pub fn validate(&self) -> AppResult<()> {
        require_text("provider name", &self.provider_name)?;
        require_phone(self.phone.as_deref())
    }
}

impl IncomePatch {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(source) = &self.source {
            require_text("source", source)?;
        }
        if let Some(category) = &self.category {
            require_text("category", category)?;
        }
        if let Some(amount) = &self.amount {
            require_non_negative(amount)?;
        }
        Ok(())
    }

    pub fn apply(self, record: &mut IncomeRecord) {
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(source) = self.source {
            record.source = source;
        }
        if let Some(amount) = self.amount {
            record.amount = amount;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(note) = self.note {
            record.note = note;
        }
    }
}

impl ExpensePatch {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(purpose) = &self.purpose {
            require_text("purpose", purpose)?;
        }
        if let Some(category) = &self.category {
            require_text("category", category)?;
        }
        if let Some(amount) = &self.amount {
            require_non_negative(amount)?;
        }
        Ok(())
    }

    pub fn apply(self, record: &mut ExpenseRecord) {
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(purpose) = self.purpose {
            record.purpose = purpose;
        }
        if let Some(amount) = self.amount {
            record.amount = amount;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(note) = self.note {
            record.note = note;
        }
    }
}

impl MealProviderPatch {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.provider_name {
            require_text("provider name", name)?;
        }
        if let Some(phone) = &self.phone {
            require_phone(phone.as_deref())?;
        }
        Ok(())
    }

    pub fn apply(self, record: &mut MealProviderRecord) {
        if let Some(name) = self.provider_name {
            record.provider_name = name;
        }
        if let Some(address) = self.address {
            record.address = address;
        }
        if let Some(phone) = self.phone {
            record.phone = phone;
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(note) = self.note {
            record.note = note;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn negative_amount_is_rejected() {
        let income = NewIncome {
            date: date(2026, 2, 19),
            source: "Kotak Infaq".into(),
            amount: BigDecimal::from(-1),
            category: "infaq".into(),
            note: None,
        };
        assert!(matches!(income.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn blank_purpose_is_rejected() {
        let expense = NewExpense {
            date: date(2026, 2, 10),
            purpose: "   ".into(),
            amount: BigDecimal::from(450_000),
            category: "operasional".into(),
            note: None,
        };
        let err = expense.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid input: purpose is required");
    }

    #[test]
    fn phone_numbers_follow_indonesian_mobile_format() {
        assert!(is_valid_phone("081234567890"));
        assert!(is_valid_phone("+62 812 3456 789"));
        assert!(is_valid_phone("6281234567"));
        assert!(!is_valid_phone("021555123"));
        assert!(!is_valid_phone("0801234567"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Confirmed".parse::<MealStatus>().unwrap(), MealStatus::Confirmed);
        assert!("lunas".parse::<MealStatus>().is_err());
    }

    #[test]
    fn patch_clears_optional_note() {
        let mut record = IncomeRecord {
            id: Uuid::nil(),
            date: date(2026, 2, 20),
            source: "Hj. Siti Fatimah".into(),
            amount: BigDecimal::from(1_000_000),
            category: "donasi".into(),
            note: Some("renovasi mihrab".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        IncomePatch {
            note: Some(None),
            amount: Some(BigDecimal::from(900_000)),
            ..Default::default()
        }
        .apply(&mut record);
        assert_eq!(record.note, None);
        assert_eq!(record.amount, BigDecimal::from(900_000));
        assert_eq!(record.source, "Hj. Siti Fatimah");
    }
}

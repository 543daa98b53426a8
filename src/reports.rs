//! Report composition: monthly, yearly, Ramadan and detail reports built
//! from store reads and the aggregation functions.
//!
//! Every operation returns `AppResult`; an unreachable store is an error,
//! never an all-zero report.

use bigdecimal::BigDecimal;
use chrono::Days;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    aggregation::{self, CategoryStatistic},
    calendar::{month_name, DateRange, RamadanWindow},
    error::{AppError, AppResult},
    models::{ExpenseRecord, IncomeRecord, MealProviderRecord},
    store::{RecordFilter, SortOrder, Stores},
};

const LATEST_INCOME_ON_DASHBOARD: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub month: u32,
    pub month_name: String,
    pub year: i32,
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub total_meal_providers: usize,
    pub balance: BigDecimal,
    pub income_tx_count: usize,
    pub expense_tx_count: usize,
    pub meal_provider_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyReport {
    pub year: i32,
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub total_meal_providers: usize,
    pub balance: BigDecimal,
    pub income_tx_count: usize,
    pub expense_tx_count: usize,
    pub meal_provider_count: usize,
    pub monthly_reports: Vec<MonthlyReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RamadanSummary {
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub balance: BigDecimal,
    pub income_count: usize,
    pub expense_count: usize,
}

/// Income and expense inside the Ramadan window.
///
/// `summary` and the record lists always reflect the store. When a side is
/// empty and placeholders are enabled, an example record for that side is
/// attached and `is_placeholder` is set, so a printed report can show a
/// labelled sample instead of a blank table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RamadanFinancialReport {
    pub window: RamadanWindow,
    pub summary: RamadanSummary,
    pub income_records: Vec<IncomeRecord>,
    pub expense_records: Vec<ExpenseRecord>,
    pub is_placeholder: bool,
    pub income_placeholder: Option<IncomeRecord>,
    pub expense_placeholder: Option<ExpenseRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailReport {
    pub income_records: Vec<IncomeRecord>,
    pub expense_records: Vec<ExpenseRecord>,
    pub meal_provider_records: Vec<MealProviderRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub balance: BigDecimal,
    pub income_tx_count: usize,
    pub expense_tx_count: usize,
    pub meal_provider_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub summary: OverallSummary,
    /// Income received inside the configured Ramadan window.
    pub ramadan_income: BigDecimal,
    pub latest_income: Vec<IncomeRecord>,
    pub schedule: Vec<MealProviderRecord>,
}

struct WindowTotals {
    income: Vec<IncomeRecord>,
    expense: Vec<ExpenseRecord>,
    meal_providers: Vec<MealProviderRecord>,
}

impl WindowTotals {
    fn total_income(&self) -> BigDecimal {
        aggregation::total(&self.income)
    }

    fn total_expense(&self) -> BigDecimal {
        aggregation::total(&self.expense)
    }
}

#[derive(Clone)]
pub struct ReportService {
    stores: Stores,
    ramadan: RamadanWindow,
    placeholders: bool,
}

impl ReportService {
    pub fn new(stores: Stores, ramadan: RamadanWindow, placeholders: bool) -> Self {
        Self {
            stores,
            ramadan,
            placeholders,
        }
    }

    pub fn ramadan(&self) -> &RamadanWindow {
        &self.ramadan
    }

    async fn load(&self, filter: &RecordFilter, order: SortOrder) -> AppResult<WindowTotals> {
        let schedule_filter = RecordFilter {
            range: filter.range,
            category: None,
        };
        let (income, expense, meal_providers) = tokio::try_join!(
            self.stores.income.find_many(filter, order),
            self.stores.expense.find_many(filter, order),
            self.stores.meal_providers.find_many(&schedule_filter, order),
        )?;
        Ok(WindowTotals {
            income,
            expense,
            meal_providers,
        })
    }

    pub async fn monthly_report(&self, month: u32, year: i32) -> AppResult<MonthlyReport> {
        let name = month_name(month)
            .ok_or_else(|| AppError::validation(format!("month must be 1-12, got {month}")))?;
        let range = DateRange::month(year, month)?;
        let w = self
            .load(&RecordFilter::in_range(range), SortOrder::Ascending)
            .await?;

        let total_income = w.total_income();
        let total_expense = w.total_expense();
        Ok(MonthlyReport {
            month,
            month_name: name.to_string(),
            year,
            balance: &total_income - &total_expense,
            total_income,
            total_expense,
            total_meal_providers: w.meal_providers.len(),
            income_tx_count: w.income.len(),
            expense_tx_count: w.expense.len(),
            meal_provider_count: w.meal_providers.len(),
        })
    }

    /// Year totals come from one whole-year read; the twelve monthly reports
    /// are then built one after another.
    pub async fn yearly_report(&self, year: i32) -> AppResult<YearlyReport> {
        let range = DateRange::year(year)?;
        let w = self
            .load(&RecordFilter::in_range(range), SortOrder::Ascending)
            .await?;

        let mut monthly_reports = Vec::with_capacity(12);
        for month in 1..=12 {
            monthly_reports.push(self.monthly_report(month, year).await?);
        }

        let total_income = w.total_income();
        let total_expense = w.total_expense();
        Ok(YearlyReport {
            year,
            balance: &total_income - &total_expense,
            total_income,
            total_expense,
            total_meal_providers: w.meal_providers.len(),
            income_tx_count: w.income.len(),
            expense_tx_count: w.expense.len(),
            meal_provider_count: w.meal_providers.len(),
            monthly_reports,
        })
    }

    pub async fn ramadan_financial_report(&self) -> AppResult<RamadanFinancialReport> {
        let filter = RecordFilter::in_range(self.ramadan.range());
        let (income_records, expense_records) = tokio::try_join!(
            self.stores.income.find_many(&filter, SortOrder::Ascending),
            self.stores.expense.find_many(&filter, SortOrder::Ascending),
        )?;

        let total_income = aggregation::total(&income_records);
        let total_expense = aggregation::total(&expense_records);
        let summary = RamadanSummary {
            balance: &total_income - &total_expense,
            total_income,
            total_expense,
            income_count: income_records.len(),
            expense_count: expense_records.len(),
        };

        let income_placeholder = (self.placeholders && income_records.is_empty())
            .then(|| self.placeholder_income());
        let expense_placeholder = (self.placeholders && expense_records.is_empty())
            .then(|| self.placeholder_expense());
        let is_placeholder = income_placeholder.is_some() || expense_placeholder.is_some();
        if is_placeholder {
            log::debug!(
                "ramadan report uses placeholders (income: {}, expense: {})",
                income_placeholder.is_some(),
                expense_placeholder.is_some()
            );
        }

        Ok(RamadanFinancialReport {
            window: self.ramadan,
            summary,
            income_records,
            expense_records,
            is_placeholder,
            income_placeholder,
            expense_placeholder,
        })
    }

    pub async fn ramadan_schedule_report(&self) -> AppResult<Vec<MealProviderRecord>> {
        let filter = RecordFilter::in_range(self.ramadan.range());
        self.stores
            .meal_providers
            .find_many(&filter, SortOrder::Ascending)
            .await
    }

    /// Income and expense are filtered by range and category, meal providers
    /// by range only. Newest first.
    pub async fn detail_report(
        &self,
        range: Option<DateRange>,
        category: Option<String>,
    ) -> AppResult<DetailReport> {
        let filter = RecordFilter { range, category };
        let w = self.load(&filter, SortOrder::Descending).await?;
        Ok(DetailReport {
            income_records: w.income,
            expense_records: w.expense,
            meal_provider_records: w.meal_providers,
        })
    }

    pub async fn overall_summary(&self) -> AppResult<OverallSummary> {
        let w = self.load(&RecordFilter::all(), SortOrder::Ascending).await?;
        Ok(summarize(&w))
    }

    pub async fn income_statistics(
        &self,
        range: Option<DateRange>,
    ) -> AppResult<Vec<CategoryStatistic>> {
        let filter = RecordFilter {
            range,
            category: None,
        };
        let records = self
            .stores
            .income
            .find_many(&filter, SortOrder::Ascending)
            .await?;
        Ok(aggregation::statistics_by_category(&records))
    }

    pub async fn expense_statistics(
        &self,
        range: Option<DateRange>,
    ) -> AppResult<Vec<CategoryStatistic>> {
        let filter = RecordFilter {
            range,
            category: None,
        };
        let records = self
            .stores
            .expense
            .find_many(&filter, SortOrder::Ascending)
            .await?;
        Ok(aggregation::statistics_by_category(&records))
    }

    /// Overall totals, the latest incomes and the whole meal schedule.
    pub async fn dashboard(&self) -> AppResult<Dashboard> {
        let filter = RecordFilter::all();
        let (income, expense, schedule) = tokio::try_join!(
            self.stores.income.find_many(&filter, SortOrder::Descending),
            self.stores.expense.find_many(&filter, SortOrder::Descending),
            self.stores.meal_providers.find_many(&filter, SortOrder::Ascending),
        )?;
        let latest_income = income
            .iter()
            .take(LATEST_INCOME_ON_DASHBOARD)
            .cloned()
            .collect();
        let in_ramadan = aggregation::within(&income, &self.ramadan.range());
        let ramadan_income = aggregation::total(&in_ramadan);
        let w = WindowTotals {
            income,
            expense,
            meal_providers: schedule,
        };
        Ok(Dashboard {
            summary: summarize(&w),
            ramadan_income,
            latest_income,
            schedule: w.meal_providers,
        })
    }

    fn placeholder_date(&self) -> chrono::NaiveDate {
        self.ramadan
            .start
            .checked_add_days(Days::new(2))
            .filter(|d| self.ramadan.contains(*d))
            .unwrap_or(self.ramadan.start)
    }

    fn placeholder_income(&self) -> IncomeRecord {
        let date = self.placeholder_date();
        let stamp = date.and_time(chrono::NaiveTime::MIN).and_utc();
        IncomeRecord {
            id: Uuid::nil(),
            date,
            source: "Donatur Anonim".to_string(),
            amount: BigDecimal::from(250_000),
            category: "infaq".to_string(),
            note: Some("Infaq untuk kegiatan Ramadhan".to_string()),
            created_at: stamp,
            updated_at: stamp,
        }
    }

    fn placeholder_expense(&self) -> ExpenseRecord {
        let date = self.placeholder_date();
        let stamp = date.and_time(chrono::NaiveTime::MIN).and_utc();
        ExpenseRecord {
            id: Uuid::nil(),
            date,
            purpose: "Konsumsi Buka Puasa".to_string(),
            amount: BigDecimal::from(50_000),
            category: "konsumsi".to_string(),
            note: Some("Makanan untuk berbuka puasa bersama".to_string()),
            created_at: stamp,
            updated_at: stamp,
        }
    }
}

fn summarize(w: &WindowTotals) -> OverallSummary {
    let total_income = w.total_income();
    let total_expense = w.total_expense();
    OverallSummary {
        balance: &total_income - &total_expense,
        total_income,
        total_expense,
        income_tx_count: w.income.len(),
        expense_tx_count: w.expense.len(),
        meal_provider_count: w.meal_providers.len(),
    }
}

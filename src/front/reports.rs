use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::{
    forms::{self, SelectOption},
    AppMessage, AppState, Dayed,
};
use crate::{
    aggregation::CategoryStatistic,
    calendar::{month_name, DateRange},
    error::AppError,
    export,
    models::{
        ExpenseRecord, IncomeRecord, MealProviderRecord, EXPENSE_CATEGORIES, INCOME_CATEGORIES,
    },
    reports::{
        DetailReport, MonthlyReport, OverallSummary, RamadanFinancialReport, YearlyReport,
    },
};

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/", get(overview))
        .route("/ramadhan", get(ramadan))
        .route("/detail.csv", get(detail_csv))
}

#[derive(Deserialize, Default, Debug)]
pub struct ReportQuery {
    month: Option<u32>,
    year: Option<i32>,
    start: Option<String>,
    end: Option<String>,
    category: Option<String>,
}

impl ReportQuery {
    fn detail_filter(&self) -> Result<(Option<DateRange>, Option<String>), AppError> {
        let range = forms::parse_range(self.start.clone(), self.end.clone())?;
        Ok((range, forms::non_empty(self.category.clone())))
    }
}

#[axum::debug_handler]
async fn overview(
    State(s): State<AppState>,
    q: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, AppMessage> {
    let q = forms::query(q).map_err(|err| AppMessage::new_error(err, &s))?;
    let today = chrono::Local::now().date_naive();
    let month = q.month.unwrap_or(today.month());
    let year = q.year.unwrap_or(today.year());
    let (range, category) = q
        .detail_filter()
        .map_err(|err| AppMessage::new_error(err, &s))?;

    let (summary, monthly, yearly, income_stats, expense_stats, detail) = tokio::try_join!(
        s.reports.overall_summary(),
        s.reports.monthly_report(month, year),
        s.reports.yearly_report(year),
        s.reports.income_statistics(range),
        s.reports.expense_statistics(range),
        s.reports.detail_report(range, category.clone()),
    )
    .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct MonthOption {
        value: u32,
        name: &'static str,
        selected: bool,
    }

    #[derive(Serialize)]
    struct Ctx {
        summary: OverallSummary,
        monthly: MonthlyReport,
        yearly: YearlyReport,
        income_stats: Vec<CategoryStatistic>,
        expense_stats: Vec<CategoryStatistic>,
        detail: DetailReport,
        months: Vec<MonthOption>,
        categories: Vec<SelectOption>,
        start: Option<String>,
        end: Option<String>,
        category: Option<String>,
    }

    let mut all_categories: Vec<&str> = INCOME_CATEGORIES.to_vec();
    all_categories.extend(
        EXPENSE_CATEGORIES
            .iter()
            .filter(|c| !INCOME_CATEGORIES.contains(*c)),
    );

    let ctx = Ctx {
        summary,
        monthly,
        yearly,
        income_stats,
        expense_stats,
        detail,
        months: (1..=12)
            .filter_map(|m| {
                month_name(m).map(|name| MonthOption {
                    value: m,
                    name,
                    selected: m == month,
                })
            })
            .collect(),
        categories: forms::options(&all_categories, category.as_deref()),
        start: forms::non_empty(q.start),
        end: forms::non_empty(q.end),
        category,
    };
    s.page("reports", "Laporan", "reports", ctx)
}

/// Printable Ramadan report: finances inside the window and the meal
/// schedule with day numbers.
#[axum::debug_handler]
async fn ramadan(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let (finance, schedule) = tokio::try_join!(
        s.reports.ramadan_financial_report(),
        s.reports.ramadan_schedule_report(),
    )
    .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        finance: RamadanFinancialReport,
        income_rows: Vec<Dayed<IncomeRecord>>,
        expense_rows: Vec<Dayed<ExpenseRecord>>,
        schedule: Vec<Dayed<MealProviderRecord>>,
        days: u32,
        printed_at: String,
    }

    let ramadan = *s.ramadan();
    let income_rows = Dayed::all(finance.income_records.clone(), |r| ramadan.day_of(r.date));
    let expense_rows = Dayed::all(finance.expense_records.clone(), |r| ramadan.day_of(r.date));
    let ctx = Ctx {
        finance,
        income_rows,
        expense_rows,
        schedule: Dayed::all(schedule, |r| ramadan.day_of(r.date)),
        days: ramadan.days(),
        printed_at: chrono::Local::now().date_naive().to_string(),
    };
    s.page("ramadan_report", "Laporan Ramadhan", "reports", ctx)
}

#[axum::debug_handler]
async fn detail_csv(
    State(s): State<AppState>,
    q: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, AppMessage> {
    let q = forms::query(q).map_err(|err| AppMessage::new_error(err, &s))?;
    let (range, category) = q
        .detail_filter()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    let report = s
        .reports
        .detail_report(range, category)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    let body = export::detail_csv(&report).map_err(|err| AppMessage::new_error(err, &s))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"laporan-detail.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

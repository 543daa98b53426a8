use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    forms::{self, ExpenseForm, SelectOption},
    AppMessage, AppState, Dayed,
};
use crate::{
    aggregation,
    models::{ExpenseRecord, EXPENSE_CATEGORIES},
    store::{RecordFilter, SortOrder},
};

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", post(update))
        .route("/:id/edit", get(edit))
        .route("/:id/delete", post(delete))
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    start: Option<String>,
    end: Option<String>,
    category: Option<String>,
}

#[axum::debug_handler]
async fn list(
    State(s): State<AppState>,
    q: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, AppMessage> {
    let q = forms::query(q).map_err(|err| AppMessage::new_error(err, &s))?;
    let range = forms::parse_range(q.start.clone(), q.end.clone())
        .map_err(|err| AppMessage::new_error(err, &s))?;
    let category = forms::non_empty(q.category.clone());
    let filter = RecordFilter {
        range,
        category: category.clone(),
    };
    let records = s
        .records
        .list_expense(&filter, SortOrder::Descending)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        rows: Vec<Dayed<ExpenseRecord>>,
        total: BigDecimal,
        categories: Vec<SelectOption>,
        filter_categories: Vec<SelectOption>,
        start: Option<String>,
        end: Option<String>,
        today: String,
    }

    let ramadan = *s.ramadan();
    let ctx = Ctx {
        total: aggregation::total(&records),
        rows: Dayed::all(records, |r| ramadan.day_of(r.date)),
        categories: forms::options(EXPENSE_CATEGORIES, None),
        filter_categories: forms::options(EXPENSE_CATEGORIES, category.as_deref()),
        start: q.start,
        end: q.end,
        today: chrono::Local::now().date_naive().to_string(),
    };
    s.page("expense", "Pengeluaran", "expense", ctx)
}

#[axum::debug_handler]
async fn create(
    State(s): State<AppState>,
    Form(form): Form<ExpenseForm>,
) -> Result<Response, AppMessage> {
    let fields = form
        .into_new()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    s.records
        .add_expense(fields)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/pengeluaran").into_response())
}

#[axum::debug_handler]
async fn edit(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, AppMessage> {
    let record = s
        .records
        .get_expense(id)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        categories: Vec<SelectOption>,
        record: ExpenseRecord,
    }

    let ctx = Ctx {
        categories: forms::options(EXPENSE_CATEGORIES, Some(&record.category)),
        record,
    };
    s.page("expense_edit", "Ubah Pengeluaran", "expense", ctx)
}

#[axum::debug_handler]
async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<ExpenseForm>,
) -> Result<Response, AppMessage> {
    let patch = form
        .into_patch()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    s.records
        .edit_expense(id, patch)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/pengeluaran").into_response())
}

#[axum::debug_handler]
async fn delete(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, AppMessage> {
    s.records
        .delete_expense(id)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/pengeluaran").into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::{
        front::tests::{app, app_with, body_text, get, post_form},
        models::ExpenseRecord,
        store::{MemoryStore, RecordFilter, RecordStore, SortOrder},
    };

    #[tokio::test]
    async fn expense_outside_ramadan_has_no_day() {
        let app = app();
        let res = app
            .clone()
            .oneshot(post_form(
                "/pengeluaran",
                "date=2026-03-25&purpose=Listrik+Maret&amount=450000&category=operasional",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let html = body_text(app.oneshot(get("/pengeluaran")).await.unwrap()).await;
        assert!(html.contains("Listrik Maret"));
        assert!(!html.contains("Hari ke-"));
    }

    #[tokio::test]
    async fn category_filter_narrows_list() {
        let backend = Arc::new(MemoryStore::new());
        let app = app_with(backend.clone());
        for form in [
            "date=2026-02-20&purpose=Takjil&amount=200000&category=konsumsi",
            "date=2026-02-21&purpose=Sapu&amount=50000&category=pemeliharaan",
        ] {
            app.clone()
                .oneshot(post_form("/pengeluaran", form))
                .await
                .unwrap();
        }
        let stored = RecordStore::<ExpenseRecord>::find_many(
            &*backend,
            &RecordFilter::all(),
            SortOrder::Ascending,
        )
        .await
        .unwrap();
        assert_eq!(stored.len(), 2);

        let html = body_text(
            app.oneshot(get("/pengeluaran?category=konsumsi"))
                .await
                .unwrap(),
        )
        .await;
        assert!(html.contains("Takjil"));
        assert!(!html.contains("Sapu"));
    }

    #[tokio::test]
    async fn updating_unknown_expense_is_not_found() {
        let res = app()
            .oneshot(post_form(
                &format!("/pengeluaran/{}", uuid::Uuid::new_v4()),
                "date=2026-02-20&purpose=Takjil&amount=200000&category=konsumsi",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}

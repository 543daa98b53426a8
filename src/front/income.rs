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
    forms::{self, IncomeForm, SelectOption},
    AppMessage, AppState, Dayed,
};
use crate::{
    aggregation,
    models::{IncomeRecord, INCOME_CATEGORIES},
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
        .list_income(&filter, SortOrder::Descending)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        rows: Vec<Dayed<IncomeRecord>>,
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
        categories: forms::options(INCOME_CATEGORIES, None),
        filter_categories: forms::options(INCOME_CATEGORIES, category.as_deref()),
        start: q.start,
        end: q.end,
        today: chrono::Local::now().date_naive().to_string(),
    };
    s.page("income", "Pemasukan", "income", ctx)
}

#[axum::debug_handler]
async fn create(
    State(s): State<AppState>,
    Form(form): Form<IncomeForm>,
) -> Result<Response, AppMessage> {
    let fields = form
        .into_new()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    s.records
        .add_income(fields)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/pemasukan").into_response())
}

#[axum::debug_handler]
async fn edit(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, AppMessage> {
    let record = s
        .records
        .get_income(id)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        categories: Vec<SelectOption>,
        record: IncomeRecord,
    }

    let ctx = Ctx {
        categories: forms::options(INCOME_CATEGORIES, Some(&record.category)),
        record,
    };
    s.page("income_edit", "Ubah Pemasukan", "income", ctx)
}

#[axum::debug_handler]
async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<IncomeForm>,
) -> Result<Response, AppMessage> {
    let patch = form
        .into_patch()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    s.records
        .edit_income(id, patch)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/pemasukan").into_response())
}

#[axum::debug_handler]
async fn delete(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, AppMessage> {
    s.records
        .delete_income(id)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/pemasukan").into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::{
        front::tests::{app, app_with, body_text, get, post_form},
        models::IncomeRecord,
        store::{MemoryStore, RecordFilter, RecordStore, SortOrder},
    };

    #[tokio::test]
    async fn created_income_is_listed_with_ramadan_day() {
        let backend = Arc::new(MemoryStore::new());
        let app = app_with(backend.clone());

        let res = app
            .clone()
            .oneshot(post_form(
                "/pemasukan",
                "date=2026-02-21&source=Jamaah+Tarwih&amount=1.250.000&category=tarwih&note=",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let stored = RecordStore::<IncomeRecord>::find_many(
            &*backend,
            &RecordFilter::all(),
            SortOrder::Descending,
        )
        .await
        .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].note, None);

        let html = body_text(app.oneshot(get("/pemasukan")).await.unwrap()).await;
        assert!(html.contains("Jamaah Tarwih"));
        assert!(html.contains("Rp 1.250.000"));
        assert!(html.contains("Hari ke-3"));
    }

    #[tokio::test]
    async fn negative_amount_is_bad_request() {
        let res = app()
            .oneshot(post_form(
                "/pemasukan",
                "date=2026-02-21&source=Jamaah&amount=-5000&category=infaq",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exponent_amount_is_rejected_before_storing() {
        let backend = Arc::new(MemoryStore::new());
        let app = app_with(backend.clone());
        for amount in ["1e200000", "5e20", "123456789012345"] {
            let res = app
                .clone()
                .oneshot(post_form(
                    "/pemasukan",
                    &format!("date=2026-02-21&source=Jamaah&amount={amount}&category=infaq"),
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{amount}");
        }
        let stored = RecordStore::<IncomeRecord>::find_many(
            &*backend,
            &RecordFilter::all(),
            SortOrder::Descending,
        )
        .await
        .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn duplicate_query_field_renders_error_page() {
        let res = app()
            .oneshot(get("/pemasukan?start=2026-02-01&start=2026-02-02"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(res).await.contains("Terjadi Kesalahan"));
    }

    #[tokio::test]
    async fn missing_fields_are_bad_request() {
        let res = app()
            .oneshot(post_form("/pemasukan", "source=Jamaah"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn edit_and_delete_round() {
        let backend = Arc::new(MemoryStore::new());
        let app = app_with(backend.clone());
        app.clone()
            .oneshot(post_form(
                "/pemasukan",
                "date=2026-02-21&source=Kotak+Jumat&amount=300000&category=infaq",
            ))
            .await
            .unwrap();
        let id = RecordStore::<IncomeRecord>::find_many(
            &*backend,
            &RecordFilter::all(),
            SortOrder::Descending,
        )
        .await
        .unwrap()[0]
            .id;

        let html = body_text(
            app.clone()
                .oneshot(get(&format!("/pemasukan/{id}/edit")))
                .await
                .unwrap(),
        )
        .await;
        assert!(html.contains("Kotak Jumat"));

        let res = app
            .clone()
            .oneshot(post_form(
                &format!("/pemasukan/{id}"),
                "date=2026-02-22&source=Kotak+Jumat&amount=350000&category=infaq&note=revisi",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let updated = RecordStore::<IncomeRecord>::find_one(&*backend, id)
            .await
            .unwrap();
        assert_eq!(updated.note.as_deref(), Some("revisi"));

        let res = app
            .clone()
            .oneshot(post_form(&format!("/pemasukan/{id}/delete"), ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let res = app
            .oneshot(get(&format!("/pemasukan/{id}/edit")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn half_open_filter_is_bad_request() {
        let res = app()
            .oneshot(get("/pemasukan?start=2026-02-01&end="))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

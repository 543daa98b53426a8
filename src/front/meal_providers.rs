use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::{
    forms::{self, MealProviderForm, SelectOption, StatusForm},
    AppMessage, AppState, Dayed,
};
use crate::{
    models::{MealProviderRecord, MealStatus, PROVIDER_ADDRESSES},
    store::SortOrder,
};

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", post(update))
        .route("/:id/edit", get(edit))
        .route("/:id/status", post(set_status))
        .route("/:id/delete", post(delete))
}

/// The whole schedule, earliest first. Day numbers keep counting past the
/// end of the window.
#[axum::debug_handler]
async fn list(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let records = s
        .records
        .list_meal_providers(None, SortOrder::Ascending)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        rows: Vec<Dayed<MealProviderRecord>>,
        confirmed: usize,
        pending: usize,
        addresses: Vec<SelectOption>,
        default_date: String,
    }

    let ramadan = *s.ramadan();
    let confirmed = records
        .iter()
        .filter(|r| r.status == MealStatus::Confirmed)
        .count();
    let ctx = Ctx {
        pending: records.len() - confirmed,
        confirmed,
        rows: Dayed::all(records, |r| ramadan.day_since_start(r.date)),
        addresses: forms::options(PROVIDER_ADDRESSES, None),
        default_date: ramadan.start.to_string(),
    };
    s.page("meal_providers", "Jadwal Buka Puasa", "meal_providers", ctx)
}

#[axum::debug_handler]
async fn create(
    State(s): State<AppState>,
    Form(form): Form<MealProviderForm>,
) -> Result<Response, AppMessage> {
    let fields = form
        .into_new()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    s.records
        .add_meal_provider(fields)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/buka-puasa").into_response())
}

#[axum::debug_handler]
async fn edit(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, AppMessage> {
    let record = s
        .records
        .get_meal_provider(id)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        addresses: Vec<SelectOption>,
        record: MealProviderRecord,
    }

    let ctx = Ctx {
        addresses: forms::options(PROVIDER_ADDRESSES, record.address.as_deref()),
        record,
    };
    s.page("meal_provider_edit", "Ubah Penyedia", "meal_providers", ctx)
}

#[axum::debug_handler]
async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<MealProviderForm>,
) -> Result<Response, AppMessage> {
    let details = form
        .into_new()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    s.records
        .edit_meal_provider(id, details)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/buka-puasa").into_response())
}

#[axum::debug_handler]
async fn set_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppMessage> {
    let status = form
        .status()
        .map_err(|err| AppMessage::new_error(err, &s))?;
    s.records
        .set_meal_provider_status(id, status)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/buka-puasa").into_response())
}

#[axum::debug_handler]
async fn delete(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, AppMessage> {
    s.records
        .delete_meal_provider(id)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(Redirect::to("/buka-puasa").into_response())
}

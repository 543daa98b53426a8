pub mod expense;
pub mod forms;
pub mod income;
pub mod meal_providers;
pub mod reports;
pub mod template;

use std::path::Path;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::{
    calendar::RamadanWindow,
    config::Config,
    error::AppError,
    models::{IncomeRecord, MealProviderRecord},
    records::RecordService,
    reports::ReportService,
    store::Stores,
};

#[derive(Clone)]
pub struct AppState {
    pub records: RecordService,
    pub reports: ReportService,
    pub t: template::Template,
}

impl AppState {
    pub fn new(
        stores: Stores,
        t: template::Template,
        ramadan: RamadanWindow,
        placeholders: bool,
    ) -> Self {
        Self {
            records: RecordService::new(stores.clone()),
            reports: ReportService::new(stores, ramadan, placeholders),
            t,
        }
    }

    pub fn ramadan(&self) -> &RamadanWindow {
        self.reports.ramadan()
    }

    /// Renders `name` with the header fields every page shares.
    pub fn page<T: Serialize>(
        &self,
        name: &str,
        title: &str,
        nav: &str,
        body: T,
    ) -> Result<Response, AppMessage> {
        #[derive(Serialize)]
        struct Page<'a, T> {
            title: &'a str,
            nav: &'a str,
            ramadan_label: String,
            hijri_year: u32,
            #[serde(flatten)]
            body: T,
        }

        let ctx = Page {
            title,
            nav,
            ramadan_label: self.ramadan().label(),
            hijri_year: self.ramadan().hijri_year,
            body,
        };
        self.t
            .render(name, &ctx)
            .map_err(|err| AppMessage::new_error(err, self))
    }
}

/// A record with its Ramadan day number, when it has one.
#[derive(Serialize, Debug)]
pub struct Dayed<T> {
    #[serde(flatten)]
    pub record: T,
    pub ramadan_day: Option<u32>,
}

impl<T> Dayed<T> {
    pub fn all(records: Vec<T>, day: impl Fn(&T) -> Option<u32>) -> Vec<Self> {
        records
            .into_iter()
            .map(|record| Self {
                ramadan_day: day(&record),
                record,
            })
            .collect()
    }
}

/// Error page returned by handlers, carrying the status derived from the
/// failure.
pub struct AppMessage(Response);

impl AppMessage {
    pub fn status_of(err: &anyhow::Error) -> StatusCode {
        match err.downcast_ref::<AppError>() {
            Some(AppError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(AppError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Some(AppError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn new_error(err: impl Into<anyhow::Error>, s: &AppState) -> AppMessage {
        let err: anyhow::Error = err.into();
        let status = Self::status_of(&err);
        if status.is_server_error() {
            log::error!("{:#}", err);
        } else {
            log::warn!("{:#}", err);
        }

        #[derive(Serialize)]
        struct Ctx {
            title: &'static str,
            status: u16,
            error: String,
        }

        let ctx = Ctx {
            title: "Terjadi Kesalahan",
            status: status.as_u16(),
            error: format!("{:#}", err),
        };

        let body = match s.t.render_string("error", &ctx) {
            Ok(html) => axum::response::Html(html).into_response(),
            Err(render_err) => {
                log::error!("cannot render error page: {:#}", render_err);
                ctx.error.into_response()
            }
        };
        Self((status, body).into_response())
    }
}

impl IntoResponse for AppMessage {
    fn into_response(self) -> Response {
        self.0
    }
}

pub fn new_router(s: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard))
        .route("/api/health", get(health))
        .nest("/pemasukan", income::new_router())
        .nest("/pengeluaran", expense::new_router())
        .nest("/buka-puasa", meal_providers::new_router())
        .nest("/laporan", reports::new_router())
        .nest_service("/public", ServeDir::new(public_dir))
        .with_state(s)
}

pub async fn start_web_server(config: &Config, stores: Stores) -> anyhow::Result<()> {
    log::info!("loading templates from {}", config.templates_dir.display());
    let t = template::Template::new(&config.templates_dir)?;
    let state = AppState::new(stores, t, config.ramadan, config.ramadan_placeholders);
    let app = new_router(state, &config.public_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    log::info!("open website at http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

#[axum_macros::debug_handler]
async fn dashboard(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let d = s
        .reports
        .dashboard()
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        summary: crate::reports::OverallSummary,
        ramadan_income: bigdecimal::BigDecimal,
        latest_income: Vec<Dayed<IncomeRecord>>,
        schedule: Vec<Dayed<MealProviderRecord>>,
    }

    let ramadan = *s.ramadan();
    let ctx = Ctx {
        summary: d.summary,
        ramadan_income: d.ramadan_income,
        latest_income: Dayed::all(d.latest_income, |r| ramadan.day_of(r.date)),
        schedule: Dayed::all(d.schedule, |r| ramadan.day_since_start(r.date)),
    };
    s.page("dashboard", "Dashboard", "dashboard", ctx)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "OK",
        message: "Masjid finance service is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::store::MemoryStore;

    pub fn app_with(backend: Arc<MemoryStore>) -> Router {
        let t = template::Template::new(Path::new("./src/front/templates")).unwrap();
        let state = AppState::new(
            Stores::from_backend(backend),
            t,
            RamadanWindow::default(),
            true,
        );
        new_router(state, Path::new("./src/front/public"))
    }

    pub fn app() -> Router {
        app_with(Arc::new(MemoryStore::new()))
    }

    pub async fn body_text(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_form(uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let res = app().oneshot(get("/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/dashboard");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let res = app().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(body["status"], "OK");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn dashboard_renders_on_empty_store() {
        let res = app().oneshot(get("/dashboard")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let html = body_text(res).await;
        assert!(html.contains("Dashboard"));
        assert!(html.contains("Rp 0"));
    }

    #[tokio::test]
    async fn dashboard_shows_ramadan_income() {
        let app = app();
        app.clone()
            .oneshot(post_form(
                "/pemasukan",
                "date=2026-02-20&source=Jamaah+Tarwih&amount=175.000&category=tarwih",
            ))
            .await
            .unwrap();
        let html = body_text(app.oneshot(get("/dashboard")).await.unwrap()).await;
        assert!(html.contains("Pemasukan Ramadhan 1447 H"));
        assert!(html.contains("Rp 175.000"));
    }

    #[tokio::test]
    async fn unavailable_store_is_503() {
        let backend = Arc::new(MemoryStore::new());
        backend.set_unavailable(true);
        let res = app_with(backend).oneshot(get("/dashboard")).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn status_follows_error_kind() {
        let err = anyhow::Error::from(AppError::validation("amount"));
        assert_eq!(AppMessage::status_of(&err), StatusCode::BAD_REQUEST);
        let err = anyhow::anyhow!("template missing");
        assert_eq!(AppMessage::status_of(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn public_assets_are_served() {
        let res = app().oneshot(get("/public/style.css")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

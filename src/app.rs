#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::{BackendKind, Config};
use crate::downloader;
use crate::error::Error;
use crate::google::GoogleSheets;
use crate::item::{Item, ItemFields, format_asset_id};
use crate::options::{OptionCategory, OptionsStore};
use crate::sheets::{MemorySheets, SheetBackend};
use crate::store::ItemStore;
use crate::sync::{self, PendingEdit};

pub struct AppState {
    pub items: ItemStore,
    pub options: OptionsStore,
    pub config: Config,
}

impl AppState {
    pub fn new(backend: Arc<dyn SheetBackend>, config: Config) -> Self {
        AppState {
            items: ItemStore::new(backend.clone(), &config.items_sheet),
            options: OptionsStore::from_config(backend, &config),
            config,
        }
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Body of the "Add New Asset" form
#[derive(Deserialize)]
struct NewItemForm {
    #[serde(with = "crate::item::lenient_date", default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    item_name: String,
    #[serde(default)]
    id_number: String,
    #[serde(default)]
    keeper: String,
    #[serde(default)]
    chip_code: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    note: String,
}

#[derive(Deserialize)]
struct SaveRequest {
    rows: Vec<PendingEdit>,
}

#[derive(Deserialize)]
struct OptionForm {
    value: String,
}

/// Failure of a request, rendered as `{"status": "error", "message": ...}`
#[derive(Debug)]
pub enum ApiError {
    /// The spreadsheet service could not be reached or refused the call
    Remote(Error),
    BadRequest(String),
    NotFound(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Remote(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Remote(e @ Error::Xlsx(_)) => {
                error!("{}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Remote(e) => {
                error!("spreadsheet call failed: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Error connecting to the spreadsheet service: {}", e),
                )
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

/// Pick the sheet backend named in the configuration
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn SheetBackend>, Error> {
    match config.backend {
        BackendKind::Google => Ok(Arc::new(GoogleSheets::from_config(config)?)),
        BackendKind::Memory => Ok(Arc::new(MemorySheets::with_inventory_headers(
            &config.items_sheet,
            &config.chips_sheet,
            &config.locations_sheet,
        ))),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/", get(serve_index))
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/save", axum::routing::post(save_changes))
        .route("/api/options/:category", get(get_options).post(add_option))
        .route("/api/export.csv", get(export_csv))
        .route("/api/export.xlsx", get(export_xlsx))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = backend_from_config(&config)?;
    let bind = config.bind.clone();

    // Setup app state
    let app_state = Arc::new(AppState::new(backend, config));
    let app = router(app_state);

    // Start server
    let listener = TcpListener::bind(bind.as_str()).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Render the page with the prefix and both option lists baked in
///
/// Options are read once per page load; adding one reloads the page.
async fn serve_index(State(state): State<Arc<AppState>>) -> Html<String> {
    let chips = state.options.list(OptionCategory::Chips).await;
    let locations = state.options.list(OptionCategory::Locations).await;

    let page_data = json!({
        "idPrefix": state.config.id_prefix,
        "today": Local::now().date_naive().to_string(),
        "chipOptions": chips,
        "locationOptions": locations,
    });

    // keep option text from closing the script tag
    let page_data = page_data.to_string().replace('<', "\\u003c");

    let template = include_str!("./static/index.html");
    Html(template.replace(
        "</head>",
        &format!("    <script>const INVENTORY = {};</script>\n</head>", page_data),
    ))
}

async fn filtered_items(state: &AppState, term: &str) -> Result<Vec<Item>, ApiError> {
    let items = state.items.list_all().await?;
    Ok(items.into_iter().filter(|item| item.matches(term)).collect())
}

async fn list_items(
    Query(params): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Item>>, ApiError> {
    Ok(Json(filtered_items(&state, &params.q).await?))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(form): Json<NewItemForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if form.item_name.trim().is_empty() || form.id_number.trim().is_empty() {
        return Err(ApiError::BadRequest("Required fields missing!".to_string()));
    }

    let full_id = format_asset_id(&state.config.id_prefix, &form.id_number);
    let fields = ItemFields {
        date: form.date.or_else(|| Some(Local::now().date_naive())),
        item_name: form.item_name,
        item_id: full_id.clone(),
        keeper: form.keeper,
        chip_code: form.chip_code,
        location: form.location,
        note: form.note,
    };
    let id = state.items.create(&fields).await?;

    Ok(Json(json!({
        "status": "ok",
        "id": id,
        "item_id": full_id,
        "message": format!("Added: {}", full_id),
    })))
}

async fn save_changes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveRequest>,
) -> Response {
    match sync::save_all(&state.items, &request.rows).await {
        Ok(report) => Json(json!({
            "status": "ok",
            "updated": report.updated,
            "deleted": report.deleted,
            "missing": report.missing,
            "skipped": report.skipped,
        }))
        .into_response(),
        Err(e) => {
            error!("{}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "status": "error",
                    "message": format!("Error: {}", e.source),
                    "committed": e.report.committed(),
                })),
            )
                .into_response()
        }
    }
}

fn parse_category(raw: &str) -> Result<OptionCategory, ApiError> {
    raw.parse::<OptionCategory>().map_err(ApiError::NotFound)
}

async fn get_options(
    Path(category): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let category = parse_category(&category)?;
    Ok(Json(state.options.list(category).await))
}

async fn add_option(
    Path(category): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(form): Json<OptionForm>,
) -> Result<Response, ApiError> {
    let category = parse_category(&category)?;
    let value = form.value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest("Option value cannot be empty".to_string()));
    }

    if state.options.add(category, value).await? {
        Ok(Json(json!({ "status": "ok", "message": "Added!" })).into_response())
    } else {
        Ok((
            StatusCode::CONFLICT,
            Json(json!({ "status": "exists", "message": "Exists." })),
        )
            .into_response())
    }
}

async fn export_csv(
    Query(params): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let items = filtered_items(&state, &params.q).await?;
    let body = downloader::to_csv(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"inventory.csv\""),
        ],
        body,
    )
        .into_response())
}

async fn export_xlsx(
    Query(params): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let items = filtered_items(&state, &params.q).await?;
    let body = downloader::to_xlsx(&items)?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"inventory.xlsx\""),
        ],
        body,
    )
        .into_response())
}

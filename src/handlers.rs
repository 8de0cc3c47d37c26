use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    models::{
        Advisory, Country, DataSourceUrl, DeleteItemsInput, HealthResponse, ItemCategory,
        NewItemInput, ReminderInput, ReminderView,
    },
    packing::PackingList,
    reminder::{unpacked_items_count, ReminderScheduler, ScheduleOutcome},
    store::{self, Db},
};

pub struct AppState {
    pub conn: Db,
    pub catalog: Arc<Catalog>,
    pub packing: Arc<PackingList>,
    pub reminder: Arc<ReminderScheduler>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Countries
        .route("/api/countries", get(list_countries).post(add_country))
        .route("/api/countries/refresh", post(refresh_countries))
        .route("/api/countries/status", get(catalog_status))
        .route("/api/countries/:id", get(get_country).delete(delete_country))
        .route("/api/settings/data-url", get(get_data_url).put(set_data_url))
        // Packing list
        .route("/api/packing", get(list_items).post(add_item))
        .route("/api/packing/summary", get(packing_summary))
        .route("/api/packing/delete", post(delete_items))
        .route("/api/packing/:id", axum::routing::delete(delete_item))
        .route("/api/packing/:id/toggle", post(toggle_item))
        // Reminder
        .route(
            "/api/reminder",
            get(get_reminder).put(update_reminder).delete(cancel_reminder),
        )
        .route("/api/reminder/notifications", get(pending_notifications))
        .route("/api/reminder/advisory", get(advisory))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn internal_error(msg: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    error!("{}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": msg.to_string()})),
    )
}

fn not_found(msg: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": msg})))
}

fn bad_request(msg: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": msg})))
}

fn conflict(msg: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::CONFLICT, Json(json!({"error": msg})))
}

/// Runs a blocking store call off the async runtime and maps failures to a 500.
async fn blocking<T, F>(f: F) -> Result<T, Response>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(internal_error(e).into_response()),
        Err(e) => Err(internal_error(e).into_response()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Countries
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub async fn list_countries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let countries = state.catalog.search(params.q.as_deref().unwrap_or(""));
    (StatusCode::OK, Json(json!(countries)))
}

pub async fn get_country(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.catalog.get(id) {
        Some(country) => (StatusCode::OK, Json(json!(country))).into_response(),
        None => not_found("country not found").into_response(),
    }
}

pub async fn add_country(
    State(state): State<Arc<AppState>>,
    Json(country): Json<Country>,
) -> impl IntoResponse {
    let catalog = state.catalog.clone();
    match blocking(move || catalog.add_country(country)).await {
        Ok(Some(country)) => (StatusCode::CREATED, Json(json!(country))).into_response(),
        Ok(None) => conflict("a country with this id already exists").into_response(),
        Err(resp) => resp,
    }
}

pub async fn delete_country(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let catalog = state.catalog.clone();
    match blocking(move || catalog.delete_country(id)).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("country not found").into_response(),
        Err(resp) => resp,
    }
}

pub async fn refresh_countries(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state.catalog.refresh().await;
    let status = state.catalog.status();
    (
        StatusCode::OK,
        Json(json!({"result": outcome, "status": status})),
    )
}

pub async fn catalog_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(state.catalog.status())))
}

pub async fn get_data_url(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let url = DataSourceUrl {
        url: state.catalog.data_source_url(),
    };
    (StatusCode::OK, Json(json!(url)))
}

pub async fn set_data_url(
    State(state): State<Arc<AppState>>,
    Json(input): Json<DataSourceUrl>,
) -> impl IntoResponse {
    let url = input.url.trim().to_string();
    if url.is_empty() {
        return bad_request("url is required").into_response();
    }
    let catalog = state.catalog.clone();
    let saved = url.clone();
    match blocking(move || catalog.set_data_source_url(&saved)).await {
        Ok(()) => (StatusCode::OK, Json(json!(DataSourceUrl { url }))).into_response(),
        Err(resp) => resp,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Packing list
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CategoryParams {
    pub category: Option<ItemCategory>,
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryParams>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!(state.packing.filtered(params.category))),
    )
}

pub async fn packing_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryParams>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!(state.packing.summary(params.category))),
    )
}

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewItemInput>,
) -> impl IntoResponse {
    let packing = state.packing.clone();
    match blocking(move || packing.add_item(&input.name, input.category)).await {
        Ok(Some(item)) => (StatusCode::CREATED, Json(json!(item))).into_response(),
        Ok(None) => bad_request("name is required").into_response(),
        Err(resp) => resp,
    }
}

pub async fn toggle_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let packing = state.packing.clone();
    match blocking(move || packing.toggle_packed(id)).await {
        Ok(Some(item)) => (StatusCode::OK, Json(json!(item))).into_response(),
        Ok(None) => not_found("item not found").into_response(),
        Err(resp) => resp,
    }
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let packing = state.packing.clone();
    match blocking(move || packing.delete_item(id)).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("item not found").into_response(),
        Err(resp) => resp,
    }
}

pub async fn delete_items(
    State(state): State<Arc<AppState>>,
    Json(input): Json<DeleteItemsInput>,
) -> impl IntoResponse {
    let packing = state.packing.clone();
    match blocking(move || packing.delete_items(&input.ids)).await {
        Ok(removed) => (StatusCode::OK, Json(json!({"removed": removed}))).into_response(),
        Err(resp) => resp,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reminder
// ────────────────────────────────────────────────────────────────────────────

fn reminder_view(scheduler: &ReminderScheduler) -> ReminderView {
    ReminderView {
        reminder: scheduler.current(),
        state: scheduler.state(),
    }
}

pub async fn get_reminder(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(reminder_view(&state.reminder))))
}

pub async fn update_reminder(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ReminderInput>,
) -> impl IntoResponse {
    let scheduler = state.reminder.clone();
    match blocking(move || scheduler.update_reminder(input)).await {
        Ok(ScheduleOutcome::RejectedPastTarget) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "reminder date must be in the future",
                "result": ScheduleOutcome::RejectedPastTarget,
            })),
        )
            .into_response(),
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({"result": outcome, "reminder": reminder_view(&state.reminder)})),
        )
            .into_response(),
        Err(resp) => resp,
    }
}

pub async fn cancel_reminder(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let scheduler = state.reminder.clone();
    match blocking(move || scheduler.cancel_reminder()).await {
        Ok(_) => (StatusCode::OK, Json(json!(reminder_view(&state.reminder)))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn pending_notifications(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let scheduler = state.reminder.clone();
    match blocking(move || scheduler.pending()).await {
        Ok(pending) => (StatusCode::OK, Json(json!(pending))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn advisory(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = Advisory {
        unpacked_items: unpacked_items_count(&state.packing.items()),
    };
    (StatusCode::OK, Json(json!(resp)))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let conn = state.conn.clone();
    let db_ok = tokio::task::spawn_blocking(move || store::ping(&conn))
        .await
        .unwrap_or(false);

    let resp = HealthResponse {
        status: "ok".to_string(),
        db: if db_ok { "ok".to_string() } else { "error".to_string() },
    };
    (StatusCode::OK, Json(json!(resp)))
}

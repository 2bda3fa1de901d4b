use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheStats, TtlCache};
use crate::config::Config;
use crate::error::ErrorHandler;
use crate::menu::MenuService;
use crate::models::{Allergen, Dish, Lang, MenuData};
use crate::monitor::{MonitorStats, PerformanceMonitor};
use crate::queries;

const CACHE_CONTROL_VALUE: &str = "public, max-age=300, s-maxage=600, stale-while-revalidate=300";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<MenuService>,
    pub cache: Arc<TtlCache>,
    pub monitor: Arc<PerformanceMonitor>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub cache: CacheStats,
    pub performance: MonitorStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MenuErrorResponse {
    pub error: String,
    pub message: String,
    pub fallback: MenuData,
}

#[derive(Debug, Serialize)]
pub struct MenuOfTheDayResponse {
    pub dishes: Vec<Dish>,
}

// Route handlers
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: state.cache.stats(),
        performance: state.monitor.stats(),
    })
}

pub async fn get_menu(State(state): State<AppState>, Path(lang): Path<String>) -> Response {
    let lang = match Lang::from_str(&lang) {
        Ok(lang) => lang,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response();
        }
    };

    let started = Instant::now();
    match state.service.try_get_menu_data(lang).await {
        Ok(menu_data) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            (
                StatusCode::OK,
                [
                    ("cache-control", CACHE_CONTROL_VALUE.to_string()),
                    ("x-response-time", format!("{:.2}ms", elapsed_ms)),
                ],
                Json(menu_data),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!("Error fetching menu data for {}: {}", lang, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MenuErrorResponse {
                    error: "Failed to fetch menu data".to_string(),
                    message: err.to_string(),
                    fallback: ErrorHandler::canonical_fallback(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn get_menu_of_the_day(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> Response {
    let lang = match Lang::from_str(&lang) {
        Ok(lang) => lang,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response();
        }
    };

    match state.service.try_menu_of_the_day(lang).await {
        Ok(dishes) => (StatusCode::OK, Json(MenuOfTheDayResponse { dishes })).into_response(),
        Err(err) => {
            tracing::error!("Error fetching menu of the day for {}: {}", lang, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn get_allergens(State(state): State<AppState>, Path(lang): Path<String>) -> Response {
    let lang = match Lang::from_str(&lang) {
        Ok(lang) => lang,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response();
        }
    };

    // Reference data degrades to an empty list rather than failing the page.
    let allergens: Vec<Allergen> = state
        .service
        .handler()
        .with_fallback(
            queries::fetch_allergens(state.service.source(), lang),
            Vec::new(),
        )
        .await;

    (StatusCode::OK, Json(allergens)).into_response()
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/menu/:lang", get(get_menu))
        .route("/api/menu/:lang/today", get(get_menu_of_the_day))
        .route("/api/allergens/:lang", get(get_allergens))
        .with_state(state)
}

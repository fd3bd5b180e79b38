pub mod assets;
pub mod chart;
pub mod health;
pub mod history;

use crate::AppState;
use axum::Router;
use serde::Serialize;

/// API response envelope shared by the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// True when the response was served from stored data without an
    /// upstream call.
    pub cached: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, cached: bool) -> Self {
        Self {
            data,
            meta: ApiMeta { cached },
        }
    }
}

/// Create the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/assets", assets::router())
        .nest("/api/history", history::router())
        .nest("/chart", chart::router())
}

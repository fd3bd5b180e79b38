use crate::api::ApiResponse;
use crate::types::PricePoint;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Price history payload for one symbol.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub symbol: String,
    pub samples: Vec<PricePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// GET /api/history/:symbol
///
/// Always 200: an unknown symbol or upstream outage yields an empty sample
/// list rather than an error.
async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<ApiResponse<HistoryResponse>> {
    let reading = state.history.history(&symbol).await;

    Json(ApiResponse::new(
        HistoryResponse {
            symbol: symbol.to_uppercase(),
            samples: reading.samples,
            last_updated: reading.last_updated,
        },
        reading.cached,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:symbol", get(get_history))
}

use crate::api::ApiResponse;
use crate::error::{AppError, Result};
use crate::types::AssetSnapshot;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    limit: Option<usize>,
}

/// GET /api/assets
async fn get_listings(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> Json<ApiResponse<Vec<AssetSnapshot>>> {
    let limit = params
        .limit
        .unwrap_or(state.config.top_n)
        .clamp(1, state.config.top_n.max(1));

    let (data, cached) = state.market.top_assets(limit).await;
    Json(ApiResponse::new(data, cached))
}

/// GET /api/assets/:symbol
async fn get_asset(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<AssetSnapshot>>> {
    match state.market.asset(&symbol).await {
        Some(snap) => Ok(Json(ApiResponse::new(snap, true))),
        None => Err(AppError::UnknownSymbol(symbol.to_uppercase())),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_listings))
        .route("/:symbol", get(get_asset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_query_deserialization() {
        let query: ListingQuery = serde_json::from_str(r#"{"limit": 25}"#).unwrap();
        assert_eq!(query.limit, Some(25));
    }

    #[test]
    fn test_listing_query_defaults() {
        let query: ListingQuery = serde_json::from_str("{}").unwrap();
        assert!(query.limit.is_none());
    }
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_catalog::{Product, Variant};
use stockroom_core::{ProductId, VariantId};
use stockroom_inventory::StockKey;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(define_stock))
        .route("/:product_id/:variant_id", get(get_stock).delete(retire_stock))
        .route("/:product_id/:variant_id/adjust", post(adjust_stock))
}

fn parse_key(product_id: &str, variant_id: &str) -> Result<StockKey, axum::response::Response> {
    let product_id: ProductId = product_id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
    })?;
    let variant_id: VariantId = variant_id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid variant id")
    })?;
    Ok(StockKey::new(product_id, variant_id))
}

pub async fn define_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::DefineStockRequest>,
) -> axum::response::Response {
    let key = match parse_key(&body.product_id, &body.variant_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    let product = match Product::new(key.product_id, body.product_name) {
        Ok(p) => p,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_name", e.to_string());
        }
    };
    let variant = match Variant::new(key.variant_id, body.variant_name) {
        Ok(v) => v,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_name", e.to_string());
        }
    };

    match services
        .store()
        .define_stock(&product, &variant, body.qty, body.unit_price_cents)
        .await
    {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((product_id, variant_id)): Path<(String, String)>,
) -> axum::response::Response {
    let key = match parse_key(&product_id, &variant_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match services.store().get_stock(key).await {
        Ok(Some(quote)) => (StatusCode::OK, Json(quote)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "no such stock row"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((product_id, variant_id)): Path<(String, String)>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let key = match parse_key(&product_id, &variant_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match services.store().adjust_stock(key, body.delta).await {
        Ok(qty) => (StatusCode::OK, Json(serde_json::json!({"qty": qty}))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn retire_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((product_id, variant_id)): Path<(String, String)>,
) -> axum::response::Response {
    let key = match parse_key(&product_id, &variant_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match services.store().retire_stock(key).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

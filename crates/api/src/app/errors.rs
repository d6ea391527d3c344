use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_infra::StoreError;
use stockroom_orders::PlaceOrderError;

/// Every placement failure resolves to a specific, renderable body: which
/// lines, what quantities. The UI renders the `lines` array entry by entry.
pub fn place_error_to_response(err: PlaceOrderError) -> axum::response::Response {
    match &err {
        PlaceOrderError::EmptyCart => {
            json_error(StatusCode::BAD_REQUEST, "empty_cart", err.to_string())
        }
        PlaceOrderError::InvalidQuantity { .. } => {
            json_error(StatusCode::BAD_REQUEST, "invalid_quantity", err.to_string())
        }
        PlaceOrderError::DuplicateLine { .. } => {
            json_error(StatusCode::BAD_REQUEST, "duplicate_line", err.to_string())
        }
        PlaceOrderError::UnknownVariant(keys) => {
            let lines: Vec<_> = keys
                .iter()
                .map(|key| {
                    json!({
                        "product_id": key.product_id.to_string(),
                        "variant_id": key.variant_id.to_string(),
                    })
                })
                .collect();
            json_error_with_lines(StatusCode::NOT_FOUND, "unknown_variant", err.to_string(), lines)
        }
        PlaceOrderError::InsufficientStock(short) => {
            let lines: Vec<_> = short
                .iter()
                .map(|line| {
                    json!({
                        "product_id": line.product_id.to_string(),
                        "variant_id": line.variant_id.to_string(),
                        "requested": line.requested,
                        "available": line.available,
                    })
                })
                .collect();
            json_error_with_lines(
                StatusCode::CONFLICT,
                "insufficient_stock",
                err.to_string(),
                lines,
            )
        }
        PlaceOrderError::Persistence(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "persistence_failure", err.to_string())
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match &err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Invalid(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
        }
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg.clone()),
        StoreError::Timeout(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "timeout", msg.clone())
        }
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg.clone())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_error_with_lines(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    lines: Vec<serde_json::Value>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "lines": lines,
        })),
    )
        .into_response()
}

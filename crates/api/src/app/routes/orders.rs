use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};

use stockroom_core::OrderId;
use stockroom_infra::HistoryQuery;
use stockroom_orders::{Cart, LineRequest, VoidPolicy};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order).get(order_history))
        .route("/:id", delete(void_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let mut lines = Vec::with_capacity(body.lines.len());
    for line in &body.lines {
        let product_id = match line.product_id.parse() {
            Ok(v) => v,
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    format!("invalid product id: {}", line.product_id),
                );
            }
        };
        let variant_id = match line.variant_id.parse() {
            Ok(v) => v,
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    format!("invalid variant id: {}", line.variant_id),
                );
            }
        };
        lines.push(LineRequest::new(product_id, variant_id, line.qty));
    }

    let cart = Cart::new(body.date, lines);
    match services.engine().place(&cart).await {
        Ok(order_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({"id": order_id.to_string()})),
        )
            .into_response(),
        Err(e) => errors::place_error_to_response(e),
    }
}

pub async fn order_history(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::HistoryParams>,
) -> axum::response::Response {
    let query = HistoryQuery {
        date_from: params.date_from,
        date_to: params.date_to,
        sort: params.sort.unwrap_or_default(),
    };

    match services.reader().run(&query).await {
        Ok(groups) => {
            let body: Vec<dto::HistoryGroupResponse> =
                groups.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn void_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(params): Query<dto::VoidParams>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id");
        }
    };

    // Restock is an explicit opt-in; the default mirrors the historical
    // behavior of never returning stock on cancellation.
    let policy = if params.restock {
        VoidPolicy::Restock
    } else {
        VoidPolicy::KeepStock
    };

    match services.engine().void(order_id, policy).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_reporting::{DayGroup, SortDirection};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub date: DateTime<Utc>,
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub variant_id: String,
    pub qty: i64,
}

#[derive(Debug, Deserialize)]
pub struct DefineStockRequest {
    pub product_id: String,
    pub product_name: String,
    pub variant_id: String,
    pub variant_name: String,
    pub qty: i64,
    pub unit_price_cents: u64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Deserialize)]
pub struct VoidParams {
    #[serde(default)]
    pub restock: bool,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct HistoryGroupResponse {
    pub order_date: NaiveDate,
    pub lines: Vec<HistoryLineResponse>,
}

#[derive(Debug, Serialize)]
pub struct HistoryLineResponse {
    pub product_name: String,
    pub variant_name: String,
    pub qty: i64,
}

impl From<DayGroup> for HistoryGroupResponse {
    fn from(group: DayGroup) -> Self {
        Self {
            order_date: group.date,
            lines: group
                .rows
                .into_iter()
                .map(|row| HistoryLineResponse {
                    product_name: row.product_name,
                    variant_name: row.variant_name,
                    qty: row.qty,
                })
                .collect(),
        }
    }
}

//! Order/stock storage contract and implementations.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

use stockroom_catalog::{Product, Variant};
use stockroom_core::OrderId;
use stockroom_inventory::{ShortLine, StockKey, StockQuote};
use stockroom_orders::{Cart, VoidPolicy};
use stockroom_reporting::{OrderRow, ReportClock};

pub use in_memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

/// Storage operation error.
///
/// Infrastructure failures only (availability, timeouts, competing writes);
/// placement's domain outcomes travel in [`PlacementFault`] instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist (or is soft-deleted where the
    /// operation requires an active one).
    #[error("not found")]
    NotFound,

    /// The request is malformed at the storage boundary (bad delta, bad
    /// range).
    #[error("invalid request: {0}")]
    Invalid(String),

    /// A competing write won; the state read inside the transaction is
    /// stale. Retrying re-reads and either succeeds or surfaces the real
    /// domain outcome.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The transaction exceeded its bounded timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The backing store could not be reached or failed mid-operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether a retry of the same logical request can succeed. Conflicts
    /// and timeouts are transient by nature; a missing row is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict(_) | StoreError::Timeout(_) | StoreError::Unavailable(_)
        )
    }
}

/// Outcome of the atomic placement operation, seen from storage.
#[derive(Debug, Error)]
pub enum PlacementFault {
    /// One or more referenced stock rows don't exist or are soft-deleted.
    #[error("unknown stock row(s)")]
    UnknownVariant(Vec<StockKey>),

    /// The snapshot had less than the cart asked for; all short lines
    /// listed. Nothing was decremented.
    #[error("insufficient stock")]
    InsufficientStock(Vec<ShortLine>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence boundary for stock and orders.
///
/// `place_order` is the heart of the contract: existence check, reservation
/// check, decrement, and order insert execute as **one atomic unit** against
/// a single consistent snapshot. Implementations guarantee that no
/// intermediate state (decremented-but-order-absent or the reverse) is ever
/// durably observable, and that two concurrent placements racing on the same
/// stock row cannot both win quantities that together exceed it.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Quantity/price of an active stock row; `None` for missing or retired.
    async fn get_stock(&self, key: StockKey) -> Result<Option<StockQuote>, StoreError>;

    /// Create or replace a stock row together with the catalog names that
    /// reporting joins against. Upsert semantics.
    async fn define_stock(
        &self,
        product: &Product,
        variant: &Variant,
        qty: i64,
        unit_price_cents: u64,
    ) -> Result<(), StoreError>;

    /// Adjust quantity-on-hand outside the order flow. Returns the new
    /// quantity.
    async fn adjust_stock(&self, key: StockKey, delta: i64) -> Result<i64, StoreError>;

    /// Soft-delete a stock row; order history referencing it survives.
    async fn retire_stock(&self, key: StockKey) -> Result<(), StoreError>;

    /// Atomically reserve, decrement, and persist the order. The cart must
    /// already have passed [`Cart::validate`]; this method owns the
    /// stock-dependent checks.
    async fn place_order(&self, order_id: OrderId, cart: &Cart) -> Result<(), PlacementFault>;

    /// Void an order. `KeepStock` only flips the status flag; `Restock`
    /// additionally returns the order's quantities to the ledger. Voiding
    /// an already-voided order is a no-op.
    async fn void_order(&self, order_id: OrderId, policy: VoidPolicy) -> Result<(), StoreError>;

    /// The grouped aggregate over non-voided order history: summed
    /// quantities per (report-local date, product name, variant name),
    /// bounded by an inclusive local-date range.
    async fn order_history(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        clock: ReportClock,
    ) -> Result<Vec<OrderRow>, StoreError>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn get_stock(&self, key: StockKey) -> Result<Option<StockQuote>, StoreError> {
        (**self).get_stock(key).await
    }

    async fn define_stock(
        &self,
        product: &Product,
        variant: &Variant,
        qty: i64,
        unit_price_cents: u64,
    ) -> Result<(), StoreError> {
        (**self)
            .define_stock(product, variant, qty, unit_price_cents)
            .await
    }

    async fn adjust_stock(&self, key: StockKey, delta: i64) -> Result<i64, StoreError> {
        (**self).adjust_stock(key, delta).await
    }

    async fn retire_stock(&self, key: StockKey) -> Result<(), StoreError> {
        (**self).retire_stock(key).await
    }

    async fn place_order(&self, order_id: OrderId, cart: &Cart) -> Result<(), PlacementFault> {
        (**self).place_order(order_id, cart).await
    }

    async fn void_order(&self, order_id: OrderId, policy: VoidPolicy) -> Result<(), StoreError> {
        (**self).void_order(order_id, policy).await
    }

    async fn order_history(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        clock: ReportClock,
    ) -> Result<Vec<OrderRow>, StoreError> {
        (**self).order_history(date_from, date_to, clock).await
    }
}

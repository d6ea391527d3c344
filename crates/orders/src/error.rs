//! Placement error taxonomy.

use thiserror::Error;

use stockroom_core::{ProductId, VariantId};
use stockroom_inventory::{ShortLine, StockKey};

/// Everything `place` can fail with.
///
/// The first three are deterministic input rejections and never touch
/// storage. `UnknownVariant` and `InsufficientStock` come back from the
/// placement transaction with no mutation performed. `Persistence` is the
/// only class worth an automatic retry: no order is created on failure, so
/// re-submitting the same logical request is safe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaceOrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("quantity must be positive for {product_id}/{variant_id}, got {qty}")]
    InvalidQuantity {
        product_id: ProductId,
        variant_id: VariantId,
        qty: i64,
    },

    #[error("duplicate cart line for {product_id}/{variant_id}")]
    DuplicateLine {
        product_id: ProductId,
        variant_id: VariantId,
    },

    /// Referenced stock rows that don't exist or are soft-deleted; all
    /// offenders are listed.
    #[error("unknown or retired stock row(s)")]
    UnknownVariant(Vec<StockKey>),

    /// One or more lines exceed available quantity; every failing line is
    /// listed with requested vs available so the caller can render them.
    #[error("insufficient stock for {} line(s)", .0.len())]
    InsufficientStock(Vec<ShortLine>),

    /// The commit transaction could not complete. Guaranteed to leave no
    /// partially-applied decrement behind.
    #[error("placement could not be persisted: {0}")]
    Persistence(String),
}

impl PlaceOrderError {
    /// Only persistence failures are worth retrying without changing the
    /// request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlaceOrderError::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_persistence_is_retryable() {
        assert!(PlaceOrderError::Persistence("timeout".into()).is_retryable());
        assert!(!PlaceOrderError::EmptyCart.is_retryable());
        assert!(!PlaceOrderError::InsufficientStock(vec![]).is_retryable());
    }
}

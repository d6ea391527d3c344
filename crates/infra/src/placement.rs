//! Order placement orchestration (application-level).
//!
//! The engine composes the pure cart validation with the store's atomic
//! placement unit:
//!
//! ```text
//! Cart
//!   ↓
//! 1. Validate (empty cart, duplicate lines, non-positive quantities)
//!   ↓
//! 2. One atomic store operation: existence check → reserve → decrement
//!    + order insert (single transaction)
//!   ↓
//! 3. Retry the retryable failure class only, bounded, with backoff
//! ```
//!
//! Validation rejections never reach storage. Domain outcomes coming back
//! from the transaction (`UnknownVariant`, `InsufficientStock`) are final.
//! Infrastructure failures are retried because no order is created on
//! failure, so re-submitting the same logical request is safe.

use std::time::Duration;

use tracing::{info, instrument, warn};

use stockroom_core::OrderId;
use stockroom_orders::{Cart, PlaceOrderError, VoidPolicy};

use crate::store::{OrderStore, PlacementFault, StoreError};

/// Bounded retry with exponential backoff for retryable store failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// No retries: fail on the first store error.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        // attempt is 1-based; first retry waits base_delay.
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

/// The order placement engine.
#[derive(Debug, Clone)]
pub struct PlacementEngine<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S> PlacementEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl<S> PlacementEngine<S>
where
    S: OrderStore,
{
    /// Place an order for `cart`. Returns the new order's identifier.
    ///
    /// On any error, no order exists and no stock was decremented.
    #[instrument(skip(self, cart), fields(lines = cart.lines.len()))]
    pub async fn place(&self, cart: &Cart) -> Result<OrderId, PlaceOrderError> {
        cart.validate()?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            // A fresh id per attempt: the previous attempt provably created
            // nothing, and reusing an id would turn an insert race into a
            // spurious duplicate-key conflict.
            let order_id = OrderId::new();

            match self.store.place_order(order_id, cart).await {
                Ok(()) => {
                    info!(%order_id, attempt, "order placed");
                    return Ok(order_id);
                }
                Err(PlacementFault::UnknownVariant(keys)) => {
                    return Err(PlaceOrderError::UnknownVariant(keys));
                }
                Err(PlacementFault::InsufficientStock(short)) => {
                    return Err(PlaceOrderError::InsufficientStock(short));
                }
                Err(PlacementFault::Store(e))
                    if e.is_retryable() && attempt < self.retry.max_attempts =>
                {
                    let delay = self.retry.delay_for(attempt);
                    warn!(attempt, ?delay, error = %e, "placement failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(PlacementFault::Store(e)) => {
                    return Err(PlaceOrderError::Persistence(e.to_string()));
                }
            }
        }
    }

    /// Void an order. Whether stock comes back is the caller's explicit
    /// policy choice; the default everywhere is [`VoidPolicy::KeepStock`].
    #[instrument(skip(self), fields(order_id = %order_id, policy = ?policy))]
    pub async fn void(&self, order_id: OrderId, policy: VoidPolicy) -> Result<(), StoreError> {
        self.store.void_order(order_id, policy).await?;
        info!(%order_id, ?policy, "order voided");
        Ok(())
    }
}

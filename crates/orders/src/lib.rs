//! Order placement domain module.
//!
//! Pure business rules for submitting a cart: input validation (empty cart,
//! duplicate lines, non-positive quantities), the persisted `Order` shape,
//! the void policy, and the placement error taxonomy. Orchestration against
//! storage lives in `stockroom-infra`.

pub mod cart;
pub mod error;
pub mod order;

pub use cart::{Cart, LineRequest};
pub use error::PlaceOrderError;
pub use order::{Order, OrderLine, VoidPolicy};

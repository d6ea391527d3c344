//! Inventory ledger domain module.
//!
//! This crate contains the business rules for quantity-on-hand, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). The
//! [`StockBook`] is the single legal mutation path for stock: order flows may
//! only move quantities through `try_reserve` + `commit`, never by writing a
//! quantity directly.

pub mod book;

pub use book::{Demand, ShortLine, StockBook, StockKey, StockQuote, StockRow};

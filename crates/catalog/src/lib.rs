//! Catalog shapes consumed by the order core.
//!
//! Product/variant lifecycle (create, rename, soft-delete) is owned by an
//! external collaborator; this crate only models the shapes the placement
//! and reporting paths read.

pub mod product;
pub mod variant;

pub use product::Product;
pub use variant::Variant;

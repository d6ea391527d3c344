use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ProductId, VariantId};
use stockroom_inventory::{Demand, StockKey};

use crate::error::PlaceOrderError;

/// One requested line of a cart: which stock row, how many.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub qty: i64,
}

impl LineRequest {
    pub fn new(product_id: ProductId, variant_id: VariantId, qty: i64) -> Self {
        Self {
            product_id,
            variant_id,
            qty,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.variant_id)
    }

    pub fn demand(&self) -> Demand {
        Demand::new(self.key(), self.qty)
    }
}

/// A submitted cart: the business date of the order plus its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<LineRequest>,
}

impl Cart {
    pub fn new(placed_at: DateTime<Utc>, lines: Vec<LineRequest>) -> Self {
        Self { placed_at, lines }
    }

    /// Deterministic input validation, run before any storage call.
    ///
    /// - a cart must have at least one line;
    /// - every quantity must be strictly positive;
    /// - no two lines may share a `(product, variant)` pair. Duplicates are
    ///   rejected rather than merged: the cart UI treats each line as one
    ///   deliberate entry, and a silent merge would hide user mistakes.
    pub fn validate(&self) -> Result<(), PlaceOrderError> {
        if self.lines.is_empty() {
            return Err(PlaceOrderError::EmptyCart);
        }

        for line in &self.lines {
            if line.qty <= 0 {
                return Err(PlaceOrderError::InvalidQuantity {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    qty: line.qty,
                });
            }
        }

        let mut seen = BTreeSet::new();
        for line in &self.lines {
            if !seen.insert(line.key()) {
                return Err(PlaceOrderError::DuplicateLine {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                });
            }
        }

        Ok(())
    }

    /// The ledger demands this cart makes, line for line.
    pub fn demands(&self) -> Vec<Demand> {
        self.lines.iter().map(LineRequest::demand).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64) -> LineRequest {
        LineRequest::new(ProductId::new(), VariantId::new(), qty)
    }

    #[test]
    fn empty_cart_is_rejected() {
        let cart = Cart::new(Utc::now(), vec![]);
        assert_eq!(cart.validate().unwrap_err(), PlaceOrderError::EmptyCart);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for qty in [0, -1] {
            let bad = line(qty);
            let cart = Cart::new(Utc::now(), vec![line(2), bad]);
            assert_eq!(
                cart.validate().unwrap_err(),
                PlaceOrderError::InvalidQuantity {
                    product_id: bad.product_id,
                    variant_id: bad.variant_id,
                    qty,
                }
            );
        }
    }

    #[test]
    fn duplicate_variant_in_cart_is_rejected_not_merged() {
        let first = line(2);
        let dup = LineRequest::new(first.product_id, first.variant_id, 1);
        let cart = Cart::new(Utc::now(), vec![first, dup]);

        assert_eq!(
            cart.validate().unwrap_err(),
            PlaceOrderError::DuplicateLine {
                product_id: first.product_id,
                variant_id: first.variant_id,
            }
        );
    }

    #[test]
    fn same_product_different_variants_is_fine() {
        let product_id = ProductId::new();
        let cart = Cart::new(
            Utc::now(),
            vec![
                LineRequest::new(product_id, VariantId::new(), 1),
                LineRequest::new(product_id, VariantId::new(), 1),
            ],
        );
        assert!(cart.validate().is_ok());
    }

    #[test]
    fn demands_mirror_lines_in_order() {
        let a = line(2);
        let b = line(5);
        let cart = Cart::new(Utc::now(), vec![a, b]);
        let demands = cart.demands();
        assert_eq!(demands.len(), 2);
        assert_eq!(demands[0], a.demand());
        assert_eq!(demands[1], b.demand());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Validation is deterministic: same cart, same verdict.
            #[test]
            fn validate_is_deterministic(
                qtys in proptest::collection::vec(-2..10i64, 0..6),
            ) {
                let lines: Vec<LineRequest> =
                    qtys.iter().map(|q| line(*q)).collect();
                let cart = Cart::new(Utc::now(), lines);
                prop_assert_eq!(cart.validate(), cart.validate());
            }
        }
    }
}

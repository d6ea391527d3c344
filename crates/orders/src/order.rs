use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Entity, OrderId, ProductId, RecordStatus, VariantId};
use stockroom_inventory::{Demand, StockKey};

/// One persisted line of an order. References a stock row by composite key
/// (weak reference; the row is shared, never owned by the order) and captures
/// quantity and unit price at order time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub qty: i64,
    /// Price in smallest currency unit (e.g., cents), as of placement.
    pub unit_price_cents: u64,
}

impl OrderLine {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.variant_id)
    }

    pub fn demand(&self) -> Demand {
        Demand::new(self.key(), self.qty)
    }
}

/// How voiding an order treats the ledger.
///
/// The default preserves the historical behavior of the system this replaces:
/// voiding flips the status flag and never restocks (orders are treated as
/// immutable financial records). `Restock` is the explicit opt-in that
/// returns line quantities to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoidPolicy {
    KeepStock,
    Restock,
}

impl Default for VoidPolicy {
    fn default() -> Self {
        VoidPolicy::KeepStock
    }
}

/// A placed order. Created exactly once per successful placement; immutable
/// afterwards except for the status flag (void).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    created_at: DateTime<Utc>,
    status: RecordStatus,
    lines: Vec<OrderLine>,
}

impl Order {
    /// Assemble a new order from committed lines. The lines must already
    /// have passed cart validation and reservation; this constructor only
    /// guards the structural invariant that an order owns at least one line.
    pub fn place(
        id: OrderId,
        created_at: DateTime<Utc>,
        lines: Vec<OrderLine>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::invariant("an order must own at least one line"));
        }
        Ok(Self {
            id,
            created_at,
            status: RecordStatus::Active,
            lines,
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn is_voided(&self) -> bool {
        self.status.is_deleted()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// The ledger demands this order represents (used by restock-on-void).
    pub fn demands(&self) -> Vec<Demand> {
        self.lines.iter().map(OrderLine::demand).collect()
    }

    /// Flip the status flag. Whether stock is returned is the caller's
    /// policy decision, not the order's.
    pub fn void(&mut self) {
        self.status = RecordStatus::Deleted;
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, ProductId, RecordStatus, VariantId};

/// Composite identity of a stock row: one product in one variant.
///
/// Ordered so that batches touching several rows can be processed in a
/// canonical order (stores rely on this for deadlock-free row locking).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub variant_id: VariantId,
}

impl StockKey {
    pub fn new(product_id: ProductId, variant_id: VariantId) -> Self {
        Self {
            product_id,
            variant_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.product_id, self.variant_id)
    }
}

/// One stock row: quantity-on-hand plus the unit price captured for it.
///
/// Invariant: `qty >= 0` at all times. The only mutation paths are
/// [`StockBook::commit`] and [`StockBook::adjust`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    qty: i64,
    unit_price_cents: u64,
    status: RecordStatus,
}

impl StockRow {
    pub fn qty(&self) -> i64 {
        self.qty
    }

    /// Price in smallest currency unit (e.g., cents).
    pub fn unit_price_cents(&self) -> u64 {
        self.unit_price_cents
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn is_orderable(&self) -> bool {
        self.status.is_active()
    }
}

/// Read shape for stock lookups: quantity and price, nothing else.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockQuote {
    pub qty: i64,
    pub unit_price_cents: u64,
}

/// A requested quantity against one stock row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demand {
    pub key: StockKey,
    pub qty: i64,
}

impl Demand {
    pub fn new(key: StockKey, qty: i64) -> Self {
        Self { key, qty }
    }
}

/// One under-stocked line of a failed reservation: what was asked for and
/// what the snapshot actually had. Callers render these individually.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub requested: i64,
    pub available: i64,
}

/// The inventory ledger: quantity-on-hand per `(product, variant)`.
///
/// `StockBook` is a pure value type. Stores own one (in memory) or project
/// the same semantics onto SQL; either way, `try_reserve` and `commit` for a
/// batch must run against the same snapshot, which stores guarantee with an
/// exclusive section or a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockBook {
    rows: BTreeMap<StockKey, StockRow>,
}

impl StockBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a row regardless of status. Soft-deleted rows are retained
    /// here so history referencing them stays resolvable.
    pub fn get(&self, key: &StockKey) -> Option<&StockRow> {
        self.rows.get(key)
    }

    /// Quantity/price view of an **orderable** row; `None` for missing or
    /// soft-deleted rows.
    pub fn quote(&self, key: &StockKey) -> Option<StockQuote> {
        self.rows
            .get(key)
            .filter(|row| row.is_orderable())
            .map(|row| StockQuote {
                qty: row.qty,
                unit_price_cents: row.unit_price_cents,
            })
    }

    /// Keys from `demands` that do not resolve to an orderable row.
    pub fn unknown_keys(&self, demands: &[Demand]) -> Vec<StockKey> {
        demands
            .iter()
            .filter(|d| !self.rows.get(&d.key).is_some_and(StockRow::is_orderable))
            .map(|d| d.key)
            .collect()
    }

    /// Check a batch of demands against this snapshot.
    ///
    /// Every line is checked; **all** failing lines are reported, not just
    /// the first, so callers can present complete feedback. Missing or
    /// soft-deleted rows count as zero available. Demands on the same key
    /// are checked as their sum (callers reject duplicate cart lines before
    /// this point, but the ledger must not oversell on a malformed batch
    /// either). `&self` only: a failed reservation has no effect.
    pub fn try_reserve(&self, demands: &[Demand]) -> Result<(), Vec<ShortLine>> {
        let mut short = Vec::new();
        for (key, requested) in totals_per_key(demands) {
            let available = self
                .rows
                .get(&key)
                .filter(|row| row.is_orderable())
                .map(|row| row.qty)
                .unwrap_or(0);
            if requested > available {
                short.push(ShortLine {
                    product_id: key.product_id,
                    variant_id: key.variant_id,
                    requested,
                    available,
                });
            }
        }
        if short.is_empty() { Ok(()) } else { Err(short) }
    }

    /// Decrement every row in the batch by its reserved amount.
    ///
    /// Legal only after [`try_reserve`](Self::try_reserve) succeeded against
    /// this same snapshot. All rows are re-checked before any is touched, so
    /// a partial decrement is never observable even on misuse.
    pub fn commit(&mut self, demands: &[Demand]) -> Result<(), DomainError> {
        let totals = totals_per_key(demands);
        for (key, requested) in &totals {
            let row = self
                .rows
                .get(key)
                .filter(|row| row.is_orderable())
                .ok_or(DomainError::NotFound)?;
            if row.qty < *requested {
                return Err(DomainError::invariant(format!(
                    "commit without reservation: {} has {} on hand, {} demanded",
                    key, row.qty, requested
                )));
            }
        }
        for (key, requested) in totals {
            if let Some(row) = self.rows.get_mut(&key) {
                row.qty -= requested;
            }
        }
        Ok(())
    }

    /// Create or replace a stock row (a product was given a variant, or its
    /// quantity/price were re-entered by an admin). Upsert semantics: a
    /// soft-deleted row comes back active.
    pub fn define(
        &mut self,
        key: StockKey,
        qty: i64,
        unit_price_cents: u64,
    ) -> Result<(), DomainError> {
        if qty < 0 {
            return Err(DomainError::validation("initial quantity cannot be negative"));
        }
        self.rows.insert(
            key,
            StockRow {
                qty,
                unit_price_cents,
                status: RecordStatus::Active,
            },
        );
        Ok(())
    }

    /// Adjust quantity-on-hand outside the order flow (restock, correction).
    /// Returns the new quantity.
    pub fn adjust(&mut self, key: &StockKey, delta: i64) -> Result<i64, DomainError> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let row = self
            .rows
            .get_mut(key)
            .filter(|row| row.status.is_active())
            .ok_or(DomainError::NotFound)?;
        let new_qty = row.qty + delta;
        if new_qty < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        row.qty = new_qty;
        Ok(new_qty)
    }

    /// Return quantities to rows (used by the explicit restock-on-void
    /// policy). Soft-deleted rows are restocked too: the order being voided
    /// legitimately referenced them.
    pub fn release(&mut self, demands: &[Demand]) -> Result<(), DomainError> {
        for demand in demands {
            if !self.rows.contains_key(&demand.key) {
                return Err(DomainError::NotFound);
            }
        }
        for demand in demands {
            if let Some(row) = self.rows.get_mut(&demand.key) {
                row.qty += demand.qty;
            }
        }
        Ok(())
    }

    /// Soft-delete a row (variant removed from the product's set). History
    /// referencing the row survives. Retiring an already-retired row is a
    /// no-op.
    pub fn retire(&mut self, key: &StockKey) -> Result<(), DomainError> {
        let row = self.rows.get_mut(key).ok_or(DomainError::NotFound)?;
        row.status = RecordStatus::Deleted;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StockKey, &StockRow)> {
        self.rows.iter()
    }
}

fn totals_per_key(demands: &[Demand]) -> BTreeMap<StockKey, i64> {
    let mut totals = BTreeMap::new();
    for demand in demands {
        *totals.entry(demand.key).or_insert(0) += demand.qty;
    }
    totals
}

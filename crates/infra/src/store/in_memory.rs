use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use stockroom_catalog::{Product, Variant};
use stockroom_core::{DomainError, Entity, OrderId, ProductId, VariantId};
use stockroom_inventory::{StockBook, StockKey, StockQuote};
use stockroom_orders::{Cart, Order, OrderLine, VoidPolicy};
use stockroom_reporting::{OrderRow, ReportClock};

use super::{OrderStore, PlacementFault, StoreError};

#[derive(Debug, Default)]
struct State {
    book: StockBook,
    product_names: HashMap<ProductId, String>,
    variant_names: HashMap<VariantId, String>,
    orders: BTreeMap<OrderId, Order>,
}

/// In-memory order store.
///
/// Intended for tests/dev. One `RwLock` guards the whole state, so every
/// placement runs its existence check, reservation, decrement, and order
/// insert under a single exclusive section: trivially serializable, and a
/// competing placement observes either all of it or none of it.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    state: RwLock<State>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test support: a snapshot of a stored order.
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.orders.get(&order_id).cloned())
    }

    /// Test support: number of stored orders, voided included.
    pub fn order_count(&self) -> usize {
        self.state.read().map(|state| state.orders.len()).unwrap_or(0)
    }
}

fn map_domain(err: DomainError) -> StoreError {
    match err {
        DomainError::NotFound => StoreError::NotFound,
        DomainError::Conflict(msg) => StoreError::Conflict(msg),
        other => StoreError::Invalid(other.to_string()),
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("state lock poisoned".to_string())
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_stock(&self, key: StockKey) -> Result<Option<StockQuote>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.book.quote(&key))
    }

    async fn define_stock(
        &self,
        product: &Product,
        variant: &Variant,
        qty: i64,
        unit_price_cents: u64,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let key = StockKey::new(*product.id(), *variant.id());
        state
            .book
            .define(key, qty, unit_price_cents)
            .map_err(map_domain)?;
        state
            .product_names
            .insert(*product.id(), product.name().to_string());
        state
            .variant_names
            .insert(*variant.id(), variant.name().to_string());
        Ok(())
    }

    async fn adjust_stock(&self, key: StockKey, delta: i64) -> Result<i64, StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.book.adjust(&key, delta).map_err(map_domain)
    }

    async fn retire_stock(&self, key: StockKey) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.book.retire(&key).map_err(map_domain)
    }

    async fn place_order(&self, order_id: OrderId, cart: &Cart) -> Result<(), PlacementFault> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let demands = cart.demands();

        let unknown = state.book.unknown_keys(&demands);
        if !unknown.is_empty() {
            return Err(PlacementFault::UnknownVariant(unknown));
        }

        state
            .book
            .try_reserve(&demands)
            .map_err(PlacementFault::InsufficientStock)?;

        // Capture unit prices from the same snapshot the reservation saw.
        let lines: Vec<OrderLine> = cart
            .lines
            .iter()
            .map(|line| {
                let quote = state
                    .book
                    .quote(&line.key())
                    .expect("existence checked above under the same lock");
                OrderLine {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    qty: line.qty,
                    unit_price_cents: quote.unit_price_cents,
                }
            })
            .collect();

        state
            .book
            .commit(&demands)
            .map_err(|e| PlacementFault::Store(map_domain(e)))?;

        let order = Order::place(order_id, cart.placed_at, lines)
            .map_err(|e| PlacementFault::Store(map_domain(e)))?;
        state.orders.insert(order_id, order);
        Ok(())
    }

    async fn void_order(&self, order_id: OrderId, policy: VoidPolicy) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;

        let order = state.orders.get(&order_id).ok_or(StoreError::NotFound)?;
        if order.is_voided() {
            return Ok(());
        }
        let demands = order.demands();

        if matches!(policy, VoidPolicy::Restock) {
            state.book.release(&demands).map_err(map_domain)?;
        }
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.void();
        }
        Ok(())
    }

    async fn order_history(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        clock: ReportClock,
    ) -> Result<Vec<OrderRow>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;

        // Sum quantities per (local date, product name, variant name) while
        // keeping first-seen order, matching what the SQL grouped aggregate
        // produces.
        let mut rows: Vec<OrderRow> = Vec::new();
        let mut index: HashMap<(NaiveDate, String, String), usize> = HashMap::new();

        for order in state.orders.values() {
            if order.is_voided() {
                continue;
            }
            let occurred_on = clock.local_date(order.created_at());
            if occurred_on < date_from || occurred_on > date_to {
                continue;
            }
            for line in order.lines() {
                let product_name = state
                    .product_names
                    .get(&line.product_id)
                    .cloned()
                    .unwrap_or_else(|| line.product_id.to_string());
                let variant_name = state
                    .variant_names
                    .get(&line.variant_id)
                    .cloned()
                    .unwrap_or_else(|| line.variant_id.to_string());

                let slot = (occurred_on, product_name.clone(), variant_name.clone());
                match index.get(&slot) {
                    Some(&i) => rows[i].qty += line.qty,
                    None => {
                        index.insert(slot, rows.len());
                        rows.push(OrderRow {
                            occurred_on,
                            product_name,
                            variant_name,
                            qty: line.qty,
                        });
                    }
                }
            }
        }

        // The source query orders rows by the grouping date; buckets are
        // re-ordered downstream per the requested direction.
        rows.sort_by_key(|row| row.occurred_on);
        Ok(rows)
    }
}

//! Postgres-backed order store implementation.
//!
//! Placement executes as one transaction: the affected stock rows are locked
//! with `SELECT … FOR UPDATE` in canonical key order (deadlock avoidance),
//! every line is checked against that locked snapshot, and only then are the
//! decrements and the order insert applied. A `CHECK (qty >= 0)` constraint
//! backs the ledger invariant at the schema level as well.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database | `40001`, `40P01` | `Conflict` | Serialization failure / deadlock victim (retryable) |
//! | Database | `55P03`, `57014` | `Timeout` | Lock not available / statement timeout (retryable) |
//! | Database | `23514` | `Conflict` | Check violation — a competing decrement won the row |
//! | Database | `23505` | `Conflict` | Unique violation (duplicate order id) |
//! | Database (other) | Any other | `Unavailable` | Other database errors |
//! | PoolTimedOut | N/A | `Timeout` | No connection available in time |
//! | Io / PoolClosed | N/A | `Unavailable` | Network failure, closed pool |
//!
//! ## Thread Safety
//!
//! `PostgresOrderStore` is `Send + Sync`; the SQLx pool handles connection
//! management across threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockroom_catalog::{Product, Variant};
use stockroom_core::{Entity, OrderId};
use stockroom_inventory::{ShortLine, StockKey, StockQuote};
use stockroom_orders::{Cart, VoidPolicy};
use stockroom_reporting::{OrderRow, ReportClock};

use super::{OrderStore, PlacementFault, StoreError};

/// Schema DDL, applied by [`PostgresOrderStore::ensure_schema`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id   UUID PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS variants (
        id   UUID PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_rows (
        product_id       UUID NOT NULL REFERENCES products(id),
        variant_id       UUID NOT NULL REFERENCES variants(id),
        qty              BIGINT NOT NULL CHECK (qty >= 0),
        unit_price_cents BIGINT NOT NULL CHECK (unit_price_cents >= 0),
        status           TEXT NOT NULL DEFAULT 'active',
        PRIMARY KEY (product_id, variant_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id         UUID PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL,
        status     TEXT NOT NULL DEFAULT 'active'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_lines (
        order_id         UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        product_id       UUID NOT NULL,
        variant_id       UUID NOT NULL,
        qty              BIGINT NOT NULL CHECK (qty > 0),
        unit_price_cents BIGINT NOT NULL,
        PRIMARY KEY (order_id, product_id, variant_id),
        FOREIGN KEY (product_id, variant_id)
            REFERENCES stock_rows (product_id, variant_id)
    )
    "#,
];

/// Postgres-backed order store.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: Arc<PgPool>,
    /// Upper bound for waiting on row locks inside a placement transaction.
    lock_timeout_ms: u32,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_timeout_ms: 2_000,
        }
    }

    pub fn with_lock_timeout_ms(mut self, lock_timeout_ms: u32) -> Self {
        self.lock_timeout_ms = lock_timeout_ms;
        self
    }

    /// Create the schema if it doesn't exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for ddl in SCHEMA {
            sqlx::query(ddl)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    /// Transactions never block indefinitely: bound lock waits so a stuck
    /// competitor surfaces as a retryable timeout instead of a hang.
    async fn bound_timeouts(&self, tx: &mut Transaction<'_, Postgres>) -> Result<(), StoreError> {
        let stmt = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms);
        sqlx::query(&stmt)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;
        Ok(())
    }
}

fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(format!("{op}: pool timed out")),
        sqlx::Error::Io(io) => StoreError::Unavailable(format!("{op}: {io}")),
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("{op}: pool closed")),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("40001") | Some("40P01") => {
                StoreError::Conflict(format!("{op}: {}", db.message()))
            }
            Some("55P03") | Some("57014") => {
                StoreError::Timeout(format!("{op}: {}", db.message()))
            }
            Some("23514") | Some("23505") => {
                StoreError::Conflict(format!("{op}: {}", db.message()))
            }
            _ => StoreError::Unavailable(format!("{op}: {}", db.message())),
        },
        _ => StoreError::Unavailable(format!("{op}: {e}")),
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip(self), fields(product_id = %key.product_id, variant_id = %key.variant_id))]
    async fn get_stock(&self, key: StockKey) -> Result<Option<StockQuote>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT qty, unit_price_cents
            FROM stock_rows
            WHERE product_id = $1 AND variant_id = $2 AND status = 'active'
            "#,
        )
        .bind(*key.product_id.as_uuid())
        .bind(*key.variant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_stock", e))?;

        Ok(row.map(|row| StockQuote {
            qty: row.get::<i64, _>("qty"),
            unit_price_cents: row.get::<i64, _>("unit_price_cents") as u64,
        }))
    }

    #[instrument(skip(self, product, variant), fields(product_id = %product.id()))]
    async fn define_stock(
        &self,
        product: &Product,
        variant: &Variant,
        qty: i64,
        unit_price_cents: u64,
    ) -> Result<(), StoreError> {
        if qty < 0 {
            return Err(StoreError::Invalid(
                "initial quantity cannot be negative".to_string(),
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("define_stock", e))?;

        sqlx::query(
            "INSERT INTO products (id, name) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(*product.id().as_uuid())
        .bind(product.name())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("define_stock", e))?;

        sqlx::query(
            "INSERT INTO variants (id, name) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(*variant.id().as_uuid())
        .bind(variant.name())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("define_stock", e))?;

        sqlx::query(
            "INSERT INTO stock_rows (product_id, variant_id, qty, unit_price_cents, status)
             VALUES ($1, $2, $3, $4, 'active')
             ON CONFLICT (product_id, variant_id)
             DO UPDATE SET qty = EXCLUDED.qty,
                           unit_price_cents = EXCLUDED.unit_price_cents,
                           status = 'active'",
        )
        .bind(*product.id().as_uuid())
        .bind(*variant.id().as_uuid())
        .bind(qty)
        .bind(unit_price_cents as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("define_stock", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("define_stock", e))
    }

    #[instrument(skip(self), fields(product_id = %key.product_id, variant_id = %key.variant_id))]
    async fn adjust_stock(&self, key: StockKey, delta: i64) -> Result<i64, StoreError> {
        if delta == 0 {
            return Err(StoreError::Invalid("delta cannot be zero".to_string()));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("adjust_stock", e))?;
        self.bound_timeouts(&mut tx).await?;

        let row = sqlx::query(
            "SELECT qty FROM stock_rows
             WHERE product_id = $1 AND variant_id = $2 AND status = 'active'
             FOR UPDATE",
        )
        .bind(*key.product_id.as_uuid())
        .bind(*key.variant_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        let qty: i64 = row.ok_or(StoreError::NotFound)?.get("qty");
        let new_qty = qty + delta;
        if new_qty < 0 {
            return Err(StoreError::Invalid(format!(
                "adjustment would take {key} below zero ({qty} on hand, delta {delta})"
            )));
        }

        sqlx::query(
            "UPDATE stock_rows SET qty = $3 WHERE product_id = $1 AND variant_id = $2",
        )
        .bind(*key.product_id.as_uuid())
        .bind(*key.variant_id.as_uuid())
        .bind(new_qty)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("adjust_stock", e))?;
        Ok(new_qty)
    }

    #[instrument(skip(self), fields(product_id = %key.product_id, variant_id = %key.variant_id))]
    async fn retire_stock(&self, key: StockKey) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE stock_rows SET status = 'deleted'
             WHERE product_id = $1 AND variant_id = $2",
        )
        .bind(*key.product_id.as_uuid())
        .bind(*key.variant_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("retire_stock", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, cart), fields(order_id = %order_id, lines = cart.lines.len()))]
    async fn place_order(&self, order_id: OrderId, cart: &Cart) -> Result<(), PlacementFault> {
        let mut demands = cart.demands();
        // Canonical lock order: concurrent multi-line placements touching
        // overlapping rows acquire locks in the same sequence.
        demands.sort_by_key(|d| d.key);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("place_order", e))?;
        self.bound_timeouts(&mut tx).await?;

        let mut unknown = Vec::new();
        let mut locked: BTreeMap<StockKey, (i64, i64)> = BTreeMap::new();
        for demand in &demands {
            let row = sqlx::query(
                "SELECT qty, unit_price_cents FROM stock_rows
                 WHERE product_id = $1 AND variant_id = $2 AND status = 'active'
                 FOR UPDATE",
            )
            .bind(*demand.key.product_id.as_uuid())
            .bind(*demand.key.variant_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("place_order", e))?;

            match row {
                None => unknown.push(demand.key),
                Some(row) => {
                    locked.insert(
                        demand.key,
                        (row.get::<i64, _>("qty"), row.get::<i64, _>("unit_price_cents")),
                    );
                }
            }
        }
        if !unknown.is_empty() {
            // Dropping the transaction rolls it back; nothing was written.
            return Err(PlacementFault::UnknownVariant(unknown));
        }

        let short: Vec<ShortLine> = demands
            .iter()
            .filter_map(|demand| {
                let (available, _) = locked[&demand.key];
                (demand.qty > available).then_some(ShortLine {
                    product_id: demand.key.product_id,
                    variant_id: demand.key.variant_id,
                    requested: demand.qty,
                    available,
                })
            })
            .collect();
        if !short.is_empty() {
            return Err(PlacementFault::InsufficientStock(short));
        }

        for demand in &demands {
            let result = sqlx::query(
                "UPDATE stock_rows SET qty = qty - $3
                 WHERE product_id = $1 AND variant_id = $2 AND qty >= $3",
            )
            .bind(*demand.key.product_id.as_uuid())
            .bind(*demand.key.variant_id.as_uuid())
            .bind(demand.qty)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("place_order", e))?;

            // The rows are locked, so this can only fail if the snapshot
            // logic above is wrong.
            if result.rows_affected() != 1 {
                return Err(PlacementFault::Store(StoreError::Conflict(format!(
                    "stock row {} changed underneath the placement transaction",
                    demand.key
                ))));
            }
        }

        sqlx::query("INSERT INTO orders (id, created_at, status) VALUES ($1, $2, 'active')")
            .bind(*order_id.as_uuid())
            .bind(cart.placed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("place_order", e))?;

        for line in &cart.lines {
            let (_, unit_price_cents) = locked[&line.key()];
            sqlx::query(
                "INSERT INTO order_lines (order_id, product_id, variant_id, qty, unit_price_cents)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(*order_id.as_uuid())
            .bind(*line.product_id.as_uuid())
            .bind(*line.variant_id.as_uuid())
            .bind(line.qty)
            .bind(unit_price_cents)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("place_order", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("place_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id, policy = ?policy))]
    async fn void_order(&self, order_id: OrderId, policy: VoidPolicy) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("void_order", e))?;
        self.bound_timeouts(&mut tx).await?;

        let row = sqlx::query("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(*order_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("void_order", e))?;

        let status: String = row.ok_or(StoreError::NotFound)?.get("status");
        if status == "deleted" {
            return Ok(());
        }

        sqlx::query("UPDATE orders SET status = 'deleted' WHERE id = $1")
            .bind(*order_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("void_order", e))?;

        if matches!(policy, VoidPolicy::Restock) {
            let lines = sqlx::query(
                "SELECT product_id, variant_id, qty FROM order_lines
                 WHERE order_id = $1
                 ORDER BY product_id, variant_id",
            )
            .bind(*order_id.as_uuid())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("void_order", e))?;

            for line in lines {
                sqlx::query(
                    "UPDATE stock_rows SET qty = qty + $3
                     WHERE product_id = $1 AND variant_id = $2",
                )
                .bind(line.get::<uuid::Uuid, _>("product_id"))
                .bind(line.get::<uuid::Uuid, _>("variant_id"))
                .bind(line.get::<i64, _>("qty"))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("void_order", e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("void_order", e))
    }

    #[instrument(skip(self), fields(date_from = %date_from, date_to = %date_to))]
    async fn order_history(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        clock: ReportClock,
    ) -> Result<Vec<OrderRow>, StoreError> {
        let offset_secs = f64::from(clock.offset().local_minus_utc());

        let rows = sqlx::query(
            r#"
            SELECT ((o.created_at AT TIME ZONE 'UTC') + make_interval(secs => $3))::date AS occurred_on,
                   p.name AS product_name,
                   v.name AS variant_name,
                   SUM(ol.qty)::bigint AS qty
            FROM orders o
            JOIN order_lines ol ON ol.order_id = o.id
            JOIN products p ON p.id = ol.product_id
            JOIN variants v ON v.id = ol.variant_id
            WHERE o.status = 'active'
              AND ((o.created_at AT TIME ZONE 'UTC') + make_interval(secs => $3))::date
                  BETWEEN $1 AND $2
            GROUP BY occurred_on, p.name, v.name
            ORDER BY occurred_on ASC
            "#,
        )
        .bind(date_from)
        .bind(date_to)
        .bind(offset_secs)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_history", e))?;

        Ok(rows
            .into_iter()
            .map(|row| OrderRow {
                occurred_on: row.get("occurred_on"),
                product_name: row.get("product_name"),
                variant_name: row.get("variant_name"),
                qty: row.get("qty"),
            })
            .collect())
    }
}

//! Postgres-backed linen store.
//!
//! Every write method runs in one transaction, so a failure anywhere leaves the
//! tables untouched.
//!
//! ## Change ids
//!
//! Writers take `LOCK TABLE change_events IN EXCLUSIVE MODE` before computing
//! `MAX(id) + 1`. The lock is held until commit, so ids are gap-free and commit
//! in id order; plain `SELECT`s are not blocked by it. Pollers read the feed in
//! a `REPEATABLE READ` snapshot so `max_id` and `updates` agree.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database (any code) | `Backend` with the operation name and message |
//! | PoolClosed | `Backend` |
//! | RowNotFound | `Backend` (all lookups use `fetch_optional` or `fetch_all`) |
//! | column decode failure | `Corrupt` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, debug, instrument};

use linenroom_core::{ChangeId, DomainError, MovementId};
use linenroom_supplies::{
    Catalog, CatalogItem, ChangeBatch, ChangeEvent, ChangeKind, Floor, FloorItemTotal, FloorRange,
    FloorStockEntry, ItemName, Movement, MovementItem, MovementKind, MovementStatus, NewChange,
    NewMovement, RequestBatch,
};

use super::r#trait::{
    ClearOutcome, LinenStore, RecordedRequest, StoreError, SupplyOutcome, TotalsFilter,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_items (
    name        TEXT PRIMARY KEY,
    available   BOOLEAN NOT NULL DEFAULT TRUE,
    position    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS floor_stock (
    floor       INTEGER NOT NULL,
    item        TEXT NOT NULL REFERENCES catalog_items (name),
    quantity    BIGINT NOT NULL CHECK (quantity >= 0),
    last_update TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (floor, item)
);

CREATE TABLE IF NOT EXISTS movements (
    id          BIGSERIAL PRIMARY KEY,
    floor       INTEGER,
    item        TEXT NOT NULL,
    quantity    BIGINT NOT NULL CHECK (quantity >= 0),
    occurred_at TIMESTAMPTZ NOT NULL,
    kind        TEXT NOT NULL,
    status      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS movements_floor_time ON movements (floor, occurred_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS movements_pending ON movements (status, kind);

CREATE TABLE IF NOT EXISTS change_events (
    id          BIGINT PRIMARY KEY CHECK (id > 0),
    kind        TEXT NOT NULL,
    floor       INTEGER,
    item        TEXT,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

const MOVEMENT_COLUMNS: &str = "id, floor, item, quantity, occurred_at, kind, status";

/// Postgres-backed linen store.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PostgresLinenStore {
    pool: Arc<PgPool>,
}

impl PostgresLinenStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    /// Empty every table. Only for tests running against a scratch database.
    #[cfg(test)]
    pub(crate) async fn reset(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(
            "TRUNCATE change_events, movements, floor_stock, catalog_items RESTART IDENTITY",
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reset", e))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl LinenStore for PostgresLinenStore {
    #[instrument(skip_all, fields(items = catalog.len(), floors = %floors), err)]
    async fn seed(
        &self,
        catalog: &Catalog,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;

        for (position, item) in catalog.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO catalog_items (name, available, position)
                VALUES ($1, $2, $3)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(item.name.as_str())
            .bind(item.available)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("seed_catalog", e))?;
        }

        for entry in FloorStockEntry::initial(floors, catalog, at) {
            sqlx::query(
                r#"
                INSERT INTO floor_stock (floor, item, quantity, last_update)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (floor, item) DO NOTHING
                "#,
            )
            .bind(entry.floor.number())
            .bind(entry.item.as_str())
            .bind(i64::from(entry.quantity))
            .bind(entry.last_update)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("seed_stock", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), err)]
    async fn catalog(&self) -> Result<Catalog, StoreError> {
        let rows = sqlx::query("SELECT name, available FROM catalog_items ORDER BY position")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("catalog", e))?;
        rows.iter().map(catalog_item_from_row).collect::<Result<Vec<_>, _>>().map(Catalog::from_items)
    }

    #[instrument(skip(self), fields(item = %item), err)]
    async fn set_availability(&self, item: &ItemName, available: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE catalog_items SET available = $1 WHERE name = $2")
            .bind(available)
            .bind(item.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_availability", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("catalog item '{item}'")).into());
        }
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(
            floor = %batch.floor,
            lines = batch.lines.len(),
            committed = tracing::field::Empty
        ),
        err
    )]
    async fn record_request(
        &self,
        batch: &RequestBatch,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<RecordedRequest, StoreError> {
        let mut tx = self.begin().await?;

        // FOR SHARE keeps availability fixed until this batch commits.
        let rows = sqlx::query(
            "SELECT name, available FROM catalog_items ORDER BY position FOR SHARE",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_catalog", e))?;
        let catalog = Catalog::from_items(
            rows.iter()
                .map(catalog_item_from_row)
                .collect::<Result<Vec<_>, _>>()?,
        );

        // Dropping `tx` on a rejected batch rolls it back.
        let request = batch.validate(floors, &catalog)?;

        let mut movements = Vec::with_capacity(request.lines().len());
        for new in request.movements(at) {
            movements.push(insert_movement(&mut tx, new).await?);
        }
        let changes = append_changes(&mut tx, request.changes()).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("committed", movements.len());
        Ok(RecordedRequest {
            request,
            movements,
            changes,
        })
    }

    #[instrument(skip(self), fields(floor = %floor), err)]
    async fn record_stockout(&self, floor: Floor, at: DateTime<Utc>) -> Result<Movement, StoreError> {
        let mut tx = self.begin().await?;
        reset_stock(&mut tx, &[floor.number()], 0, at).await?;
        let movement = insert_movement(&mut tx, NewMovement::stockout(floor, at)).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(movement)
    }

    #[instrument(skip_all, fields(floors = floors.len(), restock = restock), err)]
    async fn supply(
        &self,
        floors: &[Floor],
        audit: NewMovement,
        restock: u32,
        at: DateTime<Utc>,
    ) -> Result<SupplyOutcome, StoreError> {
        let numbers: Vec<i32> = floors.iter().map(|f| f.number()).collect();
        let mut tx = self.begin().await?;

        reset_stock(&mut tx, &numbers, restock, at).await?;

        let fulfilled = sqlx::query(
            r#"
            UPDATE movements SET status = $1
            WHERE status = $2 AND kind = $3 AND floor = ANY($4)
            "#,
        )
        .bind(MovementStatus::Fulfilled.as_str())
        .bind(MovementStatus::Pending.as_str())
        .bind(MovementKind::Request.as_str())
        .bind(numbers.as_slice())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("fulfil_floor_requests", e))?
        .rows_affected();

        let audit = insert_movement(&mut tx, audit).await?;
        let changes = append_changes(&mut tx, floors.iter().map(|f| NewChange::supply(*f)).collect())
            .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        debug!(fulfilled, "supply committed");
        Ok(SupplyOutcome {
            audit,
            fulfilled,
            changes,
        })
    }

    #[instrument(skip(self), err)]
    async fn clear_pending(&self) -> Result<ClearOutcome, StoreError> {
        let mut tx = self.begin().await?;

        let fulfilled = sqlx::query("UPDATE movements SET status = $1 WHERE status = $2 AND kind = $3")
            .bind(MovementStatus::Fulfilled.as_str())
            .bind(MovementStatus::Pending.as_str())
            .bind(MovementKind::Request.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_pending", e))?
            .rows_affected();

        let mut changes = append_changes(&mut tx, vec![NewChange::clear()]).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let change = changes
            .pop()
            .ok_or_else(|| StoreError::Corrupt("clear change event was not recorded".to_string()))?;
        Ok(ClearOutcome { fulfilled, change })
    }

    #[instrument(skip(self), fields(since = %since), err)]
    async fn changes_since(&self, since: ChangeId) -> Result<ChangeBatch, StoreError> {
        let cursor = i64::try_from(since.get())
            .map_err(|_| DomainError::validation("since", format!("cursor {since} is out of range")))?;

        let mut tx = self.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("snapshot", e))?;

        let max_id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM change_events")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("change_head", e))?;

        let rows = sqlx::query(
            "SELECT id, kind, floor, item FROM change_events WHERE id > $1 ORDER BY id ASC",
        )
        .bind(cursor)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("changes_since", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(ChangeBatch {
            max_id: ChangeId::new(to_u64("change_events.id", max_id)?),
            updates: rows.iter().map(change_from_row).collect::<Result<_, _>>()?,
        })
    }

    #[instrument(skip(self), fields(floor = %floor), err)]
    async fn floor_stock(&self, floor: Floor) -> Result<Vec<FloorStockEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT s.floor, s.item, s.quantity, s.last_update
            FROM floor_stock s
            JOIN catalog_items c ON c.name = s.item
            WHERE s.floor = $1
            ORDER BY c.position
            "#,
        )
        .bind(floor.number())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("floor_stock", e))?;
        rows.iter().map(stock_from_row).collect()
    }

    #[instrument(skip(self), fields(floor = %floor), err)]
    async fn floor_history(&self, floor: Floor, limit: usize) -> Result<Vec<Movement>, StoreError> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE floor = $1 \
             ORDER BY occurred_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(floor.number())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("floor_history", e))?;
        rows.iter().map(movement_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn request_totals(&self, filter: TotalsFilter) -> Result<Vec<FloorItemTotal>, StoreError> {
        let rows = match filter {
            TotalsFilter::Pending => sqlx::query(
                r#"
                SELECT floor, item, SUM(quantity)::BIGINT AS total
                FROM movements
                WHERE kind = $1 AND status = $2 AND floor IS NOT NULL
                GROUP BY floor, item
                ORDER BY floor, item
                "#,
            )
            .bind(MovementKind::Request.as_str())
            .bind(MovementStatus::Pending.as_str())
            .fetch_all(&*self.pool)
            .await,
            TotalsFilter::Since(since) => sqlx::query(
                r#"
                SELECT floor, item, SUM(quantity)::BIGINT AS total
                FROM movements
                WHERE kind = $1 AND occurred_at >= $2 AND floor IS NOT NULL
                GROUP BY floor, item
                ORDER BY floor, item
                "#,
            )
            .bind(MovementKind::Request.as_str())
            .bind(since)
            .fetch_all(&*self.pool)
            .await,
        }
        .map_err(|e| map_sqlx_error("request_totals", e))?;

        rows.iter()
            .map(|row| -> Result<FloorItemTotal, StoreError> {
                Ok(FloorItemTotal {
                    floor: Floor::new(get(row, "floor")?),
                    item: item_name(get(row, "item")?)?,
                    total: to_u64("total", get(row, "total")?)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn movement_count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("movement_count", e))?;
        to_u64("count", count)
    }
}

async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    new: NewMovement,
) -> Result<Movement, StoreError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO movements (floor, item, quantity, occurred_at, kind, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(new.floor.map(Floor::number))
    .bind(new.item.as_str())
    .bind(i64::from(new.quantity))
    .bind(new.occurred_at)
    .bind(new.kind.as_str())
    .bind(new.status.as_str())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    Ok(Movement::from_new(MovementId::new(to_u64("movements.id", id)?), new))
}

/// Append change events with the next ids. Holds the table lock until commit.
async fn append_changes(
    tx: &mut Transaction<'_, Postgres>,
    changes: Vec<NewChange>,
) -> Result<Vec<ChangeEvent>, StoreError> {
    sqlx::query("LOCK TABLE change_events IN EXCLUSIVE MODE")
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_change_events", e))?;

    let head: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM change_events")
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("change_head", e))?;

    let mut next = ChangeId::new(to_u64("change_events.id", head)?).next();
    let mut appended = Vec::with_capacity(changes.len());
    for change in changes {
        sqlx::query("INSERT INTO change_events (id, kind, floor, item) VALUES ($1, $2, $3, $4)")
            .bind(to_i64(next.get())?)
            .bind(change.kind.as_str())
            .bind(change.floor.map(Floor::number))
            .bind(change.item.as_ref().map(ItemName::as_str))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_change_event", e))?;
        appended.push(ChangeEvent::from_new(next, change));
        next = next.next();
    }
    Ok(appended)
}

async fn reset_stock(
    tx: &mut Transaction<'_, Postgres>,
    floors: &[i32],
    quantity: u32,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE floor_stock SET quantity = $1, last_update = $2 WHERE floor = ANY($3)")
        .bind(i64::from(quantity))
        .bind(at)
        .bind(floors)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("reset_stock", e))?;
    Ok(())
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("failed to read {column}: {e}")))
}

fn to_u64(column: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn to_u32(column: &str, value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("id {value} exceeds BIGINT")))
}

fn item_name(raw: String) -> Result<ItemName, StoreError> {
    ItemName::new(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn catalog_item_from_row(row: &PgRow) -> Result<CatalogItem, StoreError> {
    Ok(CatalogItem {
        name: item_name(get(row, "name")?)?,
        available: get(row, "available")?,
    })
}

fn stock_from_row(row: &PgRow) -> Result<FloorStockEntry, StoreError> {
    Ok(FloorStockEntry {
        floor: Floor::new(get(row, "floor")?),
        item: item_name(get(row, "item")?)?,
        quantity: to_u32("quantity", get(row, "quantity")?)?,
        last_update: get(row, "last_update")?,
    })
}

fn movement_from_row(row: &PgRow) -> Result<Movement, StoreError> {
    let parse = |e: DomainError| StoreError::Corrupt(e.to_string());
    Ok(Movement {
        id: MovementId::new(to_u64("movements.id", get(row, "id")?)?),
        floor: get::<Option<i32>>(row, "floor")?.map(Floor::new),
        item: MovementItem::try_from(get::<String>(row, "item")?).map_err(parse)?,
        quantity: to_u32("quantity", get(row, "quantity")?)?,
        occurred_at: get(row, "occurred_at")?,
        kind: get::<String>(row, "kind")?.parse::<MovementKind>().map_err(parse)?,
        status: get::<String>(row, "status")?.parse::<MovementStatus>().map_err(parse)?,
    })
}

fn change_from_row(row: &PgRow) -> Result<ChangeEvent, StoreError> {
    let kind = get::<String>(row, "kind")?
        .parse::<ChangeKind>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(ChangeEvent {
        id: ChangeId::new(to_u64("change_events.id", get(row, "id")?)?),
        kind,
        floor: get::<Option<i32>>(row, "floor")?.map(Floor::new),
        item: get::<Option<String>>(row, "item")?.map(item_name).transpose()?,
    })
}

/// Map SQLx errors to store errors, keeping the operation name for the logs.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            StoreError::Backend(format!(
                "database error in {operation} ({code}): {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Backend(format!("unexpected row not found in {operation}"))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::Corrupt(format!("column {index} in {operation}: {source}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_every_table() {
        for table in ["catalog_items", "floor_stock", "movements", "change_events"] {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
    }

    #[test]
    fn conversions_reject_out_of_range_values() {
        assert!(matches!(to_u64("id", -1), Err(StoreError::Corrupt(_))));
        assert!(matches!(to_u32("quantity", i64::from(u32::MAX) + 1), Err(StoreError::Corrupt(_))));
        assert_eq!(to_u32("quantity", 5).unwrap(), 5);
        assert!(to_i64(u64::MAX).is_err());
    }

    #[test]
    fn pool_closed_maps_to_backend() {
        let err = map_sqlx_error("floor_stock", sqlx::Error::PoolClosed);
        assert!(err.to_string().contains("floor_stock"));
    }
}

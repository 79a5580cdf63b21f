use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    BorrowPeriod, EquipmentRequest, InventoryItem, ItemId, ItemQuery, MAX_QUANTITY, RequestId,
    RequestQuery, RequestStatus, Result, StoreError,
    store::{
        InventoryStore, ItemDetails, QuantityUpdate, StatusChange, StatusTransition,
        delta_in_range,
    },
};

const ITEM_COLUMNS: &str =
    "id, name, description, available_quantity, provisioned_quantity, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, item_id, item_name, requested_quantity, period_start, period_end, \
     status, denial_reason, requestor_contact, created_at, updated_at";

/// PostgreSQL-backed store implementation.
///
/// Guarded updates are single `UPDATE ... WHERE <guard> RETURNING` statements,
/// so the row lock is held only for the duration of that statement.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn quantity(row: &PgRow, column: &str) -> Result<u32> {
        let raw: i32 = row.try_get(column)?;
        u32::try_from(raw).map_err(|_| StoreError::Corrupt(format!("{column} = {raw}")))
    }

    fn row_to_item(row: PgRow) -> Result<InventoryItem> {
        Ok(InventoryItem {
            id: ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            available_quantity: Self::quantity(&row, "available_quantity")?,
            provisioned_quantity: Self::quantity(&row, "provisioned_quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_request(row: PgRow) -> Result<EquipmentRequest> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<RequestStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(EquipmentRequest {
            id: RequestId::from_uuid(row.try_get::<Uuid, _>("id")?),
            item_id: ItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
            item_name: row.try_get("item_name")?,
            requested_quantity: Self::quantity(&row, "requested_quantity")?,
            period: BorrowPeriod::new(row.try_get("period_start")?, row.try_get("period_end")?),
            status,
            denial_reason: row.try_get("denial_reason")?,
            requestor_contact: row.try_get("requestor_contact")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Reads the counters a rejected guard was evaluated against.
    async fn rejected_quantity(&self, id: ItemId) -> Result<QuantityUpdate> {
        let row = sqlx::query(
            "SELECT available_quantity, provisioned_quantity FROM inventory_item WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ItemNotFound(id))?;

        Ok(QuantityUpdate::Rejected {
            available: Self::quantity(&row, "available_quantity")?,
            provisioned: Self::quantity(&row, "provisioned_quantity")?,
        })
    }
}

/// Escapes LIKE metacharacters and wraps the term for substring matching.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn insert_item(&self, item: InventoryItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_item
                (id, name, description, available_quantity, provisioned_quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(i64::from(item.available_quantity))
        .bind(i64::from(item.provisioned_quantity))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Duplicate(format!("inventory item {}", item.id));
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_item WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_item).transpose()
    }

    async fn list_items(&self, query: ItemQuery) -> Result<Vec<InventoryItem>> {
        let pattern = query.search.as_deref().map(like_pattern);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM inventory_item
            WHERE $1::text IS NULL OR name ILIKE $1 OR description ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern)
        .bind(query.limit.map(|l| l as i64))
        .bind(query.offset.map(|o| o as i64))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn update_item_details(
        &self,
        id: ItemId,
        details: ItemDetails,
    ) -> Result<InventoryItem> {
        let (clear_or_set, description) = match details.description {
            Some(description) => (true, description),
            None => (false, None),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE inventory_item
            SET name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = $5
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(details.name)
        .bind(clear_or_set)
        .bind(description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ItemNotFound(id))?;

        Self::row_to_item(row)
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inventory_item WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn conditional_update_item_quantity(
        &self,
        id: ItemId,
        expected_min: u32,
        delta: i64,
    ) -> Result<QuantityUpdate> {
        if !delta_in_range(delta) {
            return self.rejected_quantity(id).await;
        }

        let row = sqlx::query(
            r#"
            UPDATE inventory_item
            SET available_quantity = available_quantity + $3,
                updated_at = $4
            WHERE id = $1
              AND available_quantity >= $2
              AND available_quantity + $3 BETWEEN 0 AND provisioned_quantity
            RETURNING available_quantity
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(expected_min))
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(QuantityUpdate::Applied {
                available: Self::quantity(&row, "available_quantity")?,
            }),
            None => self.rejected_quantity(id).await,
        }
    }

    async fn adjust_provisioned_quantity(&self, id: ItemId, delta: i64) -> Result<QuantityUpdate> {
        if !delta_in_range(delta) {
            return self.rejected_quantity(id).await;
        }

        let row = sqlx::query(
            r#"
            UPDATE inventory_item
            SET available_quantity = available_quantity + $2,
                provisioned_quantity = provisioned_quantity + $2,
                updated_at = $3
            WHERE id = $1
              AND available_quantity + $2 >= 0
              AND provisioned_quantity + $2 <= $4
            RETURNING available_quantity
            "#,
        )
        .bind(id.as_uuid())
        .bind(delta)
        .bind(Utc::now())
        .bind(i64::from(MAX_QUANTITY))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(QuantityUpdate::Applied {
                available: Self::quantity(&row, "available_quantity")?,
            }),
            None => self.rejected_quantity(id).await,
        }
    }

    async fn insert_request(&self, request: EquipmentRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO equipment_request
                (id, item_id, item_name, requested_quantity, period_start, period_end,
                 status, denial_reason, requestor_contact, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.item_id.as_uuid())
        .bind(&request.item_name)
        .bind(i64::from(request.requested_quantity))
        .bind(request.period.start)
        .bind(request.period.end)
        .bind(request.status.as_str())
        .bind(&request.denial_reason)
        .bind(&request.requestor_contact)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return StoreError::Duplicate(format!("equipment request {}", request.id));
                }
                if db_err.is_foreign_key_violation() {
                    return StoreError::ItemNotFound(request.item_id);
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<EquipmentRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM equipment_request WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_request).transpose()
    }

    async fn list_requests(&self, query: RequestQuery) -> Result<Vec<EquipmentRequest>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM equipment_request
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR item_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.item_id.map(|id| id.as_uuid()))
        .bind(query.limit.map(|l| l as i64))
        .bind(query.offset.map(|o| o as i64))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_request).collect()
    }

    async fn conditional_update_request_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new: RequestStatus,
        change: StatusChange,
    ) -> Result<StatusTransition> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE equipment_request
            SET status = $3, denial_reason = $4, updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(change.denial_reason)
        .bind(change.at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(StatusTransition::Applied(Self::row_to_request(row)?));
        }

        let actual: Option<String> =
            sqlx::query_scalar("SELECT status FROM equipment_request WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match actual {
            Some(actual) => Ok(StatusTransition::Conflict {
                actual: actual
                    .parse()
                    .map_err(|e: crate::UnknownStatus| StoreError::Corrupt(e.to_string()))?,
            }),
            None => Err(StoreError::RequestNotFound(id)),
        }
    }
}

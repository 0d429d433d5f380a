use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::database::changeset::Changeset;
use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::preload;
use crate::database::query_builder::{bind_param_query, bind_param_query_as, QueryBuilder};
use crate::filter::QueryRequest;
use crate::middleware::AuthUser;
use crate::schema::{CreateSchema, PatchSchema};

/// List envelope: total matches plus the effective page window
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeleteConfirmation {
    pub message: String,
    pub id: i64,
}

/// Parse a path identifier; only positive integers are accepted
pub fn parse_id(raw: &str) -> Result<i64, DatabaseError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(DatabaseError::InvalidId(format!("'{}' is not a valid identifier", raw))),
    }
}

/// Generic CRUD over one entity type
pub struct Repository<E> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Filtered, sorted, paginated listing with optional eager loading
    pub async fn list(&self, request: &QueryRequest, preloads: &[&str]) -> Result<Paginated<Value>, DatabaseError> {
        let builder = QueryBuilder::<E>::new()?.request(request)?;

        let total = builder
            .count(&self.pool)
            .await
            .map_err(DatabaseError::into_query_error)?;
        let rows = builder
            .select_all(&self.pool)
            .await
            .map_err(DatabaseError::into_query_error)?;

        let mut data = to_values(&rows)?;
        preload::attach::<E>(&self.pool, &mut data, preloads).await?;

        Ok(Paginated {
            total,
            page: request.page,
            limit: request.page_size,
            data,
        })
    }

    /// Load one row, failing with NotFound when absent or soft-deleted
    pub async fn find(&self, id: i64) -> Result<E, DatabaseError> {
        let sql = format!("SELECT * FROM \"{}\" WHERE \"id\" = $1{}", E::TABLE, live_guard::<E>());
        sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found::<E>(id))
    }

    /// Load one row as JSON with the named relationships attached
    pub async fn get(&self, id: i64, preloads: &[&str]) -> Result<Value, DatabaseError> {
        let entity = self.find(id).await?;
        self.present(&entity, preloads).await
    }

    pub async fn present(&self, entity: &E, preloads: &[&str]) -> Result<Value, DatabaseError> {
        let mut data = to_values(std::slice::from_ref(entity))?;
        preload::attach::<E>(&self.pool, &mut data, preloads).await?;
        data.pop()
            .ok_or_else(|| DatabaseError::Internal("serialized row went missing".to_string()))
    }

    /// Insert a validated payload together with its dependent rows.
    ///
    /// Everything runs in one transaction; an error at any step drops the
    /// transaction, which rolls it back.
    pub async fn create<S>(&self, schema: &S, actor: Option<&AuthUser>) -> Result<E, DatabaseError>
    where
        S: CreateSchema<E>,
    {
        let mut tx = self.pool.begin().await?;

        let mut changeset = schema.changeset(&mut *tx, actor).await?;
        changeset.strip_protected();

        let sql = changeset.insert_sql(E::TABLE);
        let mut q = sqlx::query_as::<_, E>(&sql);
        for p in changeset.params().iter() {
            q = bind_param_query_as(q, p);
        }
        let created = q.fetch_one(&mut *tx).await.map_err(|e| conflict_or(e.into()))?;

        schema.after_insert(&mut *tx, &created, actor).await?;
        tx.commit().await?;

        tracing::debug!("Created {} {}", E::LABEL, created.id());
        Ok(created)
    }

    /// Partial update from a typed patch; only supplied fields change.
    pub async fn update_by_id<P>(&self, id: i64, patch: &P, preloads: &[&str]) -> Result<Value, DatabaseError>
    where
        P: PatchSchema,
    {
        let changeset = Self::patch_changeset(patch)?;
        self.apply(id, &changeset).await?;
        self.get(id, preloads).await
    }

    /// Strip protected columns; an empty remainder is a NoValidFields error
    pub fn patch_changeset<P: PatchSchema>(patch: &P) -> Result<Changeset, DatabaseError> {
        let mut changeset = patch.changeset();
        let stripped = changeset.strip_protected();
        if !stripped.is_empty() {
            tracing::debug!("Ignoring protected fields on {} update: {:?}", E::LABEL, stripped);
        }
        if changeset.is_empty() {
            return Err(DatabaseError::NoValidFields);
        }
        Ok(changeset)
    }

    /// Write a changeset to one row, stamping `updated_at` when the table has it
    pub async fn apply(&self, id: i64, changeset: &Changeset) -> Result<(), DatabaseError> {
        if changeset.is_empty() {
            return Err(DatabaseError::NoValidFields);
        }
        let sql = changeset.update_sql(E::TABLE, E::HAS_UPDATED_AT, E::SOFT_DELETE);
        let mut q = sqlx::query(&sql);
        for p in changeset.params().iter() {
            q = bind_param_query(q, p);
        }
        let result = q
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e.into()))?;
        if result.rows_affected() == 0 {
            return Err(not_found::<E>(id));
        }
        Ok(())
    }

    /// Permanently remove a row
    pub async fn delete_by_id(&self, id: i64) -> Result<DeleteConfirmation, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", E::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(not_found::<E>(id));
        }
        Ok(DeleteConfirmation {
            message: "Record deleted successfully".to_string(),
            id,
        })
    }

    /// Mark a row deleted but keep it
    pub async fn soft_delete_by_id(&self, id: i64) -> Result<DeleteConfirmation, DatabaseError> {
        if !E::SOFT_DELETE {
            return Err(DatabaseError::Internal(format!("{} does not support soft delete", E::LABEL)));
        }
        let sql = format!(
            "UPDATE \"{}\" SET \"deleted_at\" = NOW() WHERE \"id\" = $1 AND \"deleted_at\" IS NULL",
            E::TABLE
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(not_found::<E>(id));
        }
        Ok(DeleteConfirmation {
            message: "Record soft deleted successfully".to_string(),
            id,
        })
    }
}

fn live_guard<E: Entity>() -> &'static str {
    if E::SOFT_DELETE {
        " AND \"deleted_at\" IS NULL"
    } else {
        ""
    }
}

fn not_found<E: Entity>(id: i64) -> DatabaseError {
    DatabaseError::NotFound(format!("{} with ID {} not found", E::LABEL, id))
}

fn conflict_or(err: DatabaseError) -> DatabaseError {
    if err.is_unique_violation() {
        DatabaseError::Conflict("A record with the same unique value already exists".to_string())
    } else {
        err
    }
}

fn to_values<T: Serialize>(rows: &[T]) -> Result<Vec<Value>, DatabaseError> {
    rows.iter()
        .map(|r| serde_json::to_value(r).map_err(|e| DatabaseError::Internal(e.to_string())))
        .collect()
}

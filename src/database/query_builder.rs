use sqlx::{self, postgres::PgArguments, postgres::PgRow, FromRow, PgPool, Row};

use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::filter::{Filter, QueryRequest, SqlParam, SqlResult};

/// Runs a [`Filter`] built for one entity type
pub struct QueryBuilder<E> {
    filter: Filter,
    _phantom: std::marker::PhantomData<E>,
}

impl<E: Entity> QueryBuilder<E> {
    pub fn new() -> Result<Self, DatabaseError> {
        let mut filter = Filter::new(E::TABLE, E::COLUMNS)?;
        filter.soft_delete(E::SOFT_DELETE);
        Ok(Self {
            filter,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn request(mut self, request: &QueryRequest) -> Result<Self, DatabaseError> {
        self.filter.assign(request)?;
        Ok(self)
    }

    pub async fn select_all(&self, pool: &PgPool) -> Result<Vec<E>, DatabaseError> {
        let sql_result = self.filter.to_sql();
        let mut q = sqlx::query_as::<_, E>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn count(&self, pool: &PgPool) -> Result<i64, DatabaseError> {
        count(pool, &self.filter.to_count_sql()).await
    }
}

pub async fn count(pool: &PgPool, sql_result: &SqlResult) -> Result<i64, DatabaseError> {
    let mut q = sqlx::query(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query(q, p);
    }
    let row = q.fetch_one(pool).await?;
    let count: i64 = row.try_get("count")?;
    Ok(count)
}

pub fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Float(f) => q.bind(*f),
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Text(s) => q.bind(s.clone()),
        SqlParam::Timestamp(ts) => q.bind(*ts),
        SqlParam::Date(d) => q.bind(*d),
    }
}

pub fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Float(f) => q.bind(*f),
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Text(s) => q.bind(s.clone()),
        SqlParam::Timestamp(ts) => q.bind(*ts),
        SqlParam::Date(d) => q.bind(*d),
    }
}

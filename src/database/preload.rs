use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::database::entity::{Entity, Relation, RelationKind};
use crate::database::manager::DatabaseError;

/// Attach named relationships to serialized rows of `E`.
///
/// One query per relationship; belongs-to relations attach an object (or
/// null), the collection kinds attach an array.
pub async fn attach<E: Entity>(pool: &PgPool, rows: &mut [Value], names: &[&str]) -> Result<(), DatabaseError> {
    if rows.is_empty() {
        return Ok(());
    }

    for name in names {
        let relation = E::relation(name).ok_or_else(|| {
            DatabaseError::Internal(format!("{} has no relationship named '{}'", E::LABEL, name))
        })?;

        match relation.kind {
            RelationKind::BelongsTo { foreign_key } => {
                let keys = collect_keys(rows, foreign_key);
                let found = fetch_keyed(pool, &belongs_to_sql(relation), &keys).await?;
                let by_id: HashMap<i64, Value> = found.into_iter().collect();
                for row in rows.iter_mut() {
                    let target = row
                        .get(foreign_key)
                        .and_then(Value::as_i64)
                        .and_then(|id| by_id.get(&id).cloned())
                        .unwrap_or(Value::Null);
                    set_field(row, relation.name, target);
                }
            }
            RelationKind::HasMany { .. } | RelationKind::ManyToMany { .. } => {
                let keys = collect_keys(rows, "id");
                let sql = match relation.kind {
                    RelationKind::HasMany { foreign_key } => has_many_sql(relation, foreign_key),
                    RelationKind::ManyToMany { join_table, owner_key, target_key } => {
                        many_to_many_sql(relation, join_table, owner_key, target_key)
                    }
                    RelationKind::BelongsTo { .. } => unreachable!("handled above"),
                };
                let mut grouped: HashMap<i64, Vec<Value>> = HashMap::new();
                for (owner, value) in fetch_keyed(pool, &sql, &keys).await? {
                    grouped.entry(owner).or_default().push(value);
                }
                for row in rows.iter_mut() {
                    let children = row
                        .get("id")
                        .and_then(Value::as_i64)
                        .and_then(|id| grouped.remove(&id))
                        .unwrap_or_default();
                    set_field(row, relation.name, Value::Array(children));
                }
            }
        }
    }
    Ok(())
}

fn collect_keys(rows: &[Value], field: &str) -> Vec<i64> {
    rows.iter()
        .filter_map(|row| row.get(field).and_then(Value::as_i64))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn set_field(row: &mut Value, name: &str, value: Value) {
    if let Value::Object(map) = row {
        map.insert(name.to_string(), value);
    }
}

fn deleted_guard(relation: &Relation) -> &'static str {
    if relation.soft_delete {
        " AND t.\"deleted_at\" IS NULL"
    } else {
        ""
    }
}

fn belongs_to_sql(relation: &Relation) -> String {
    format!(
        "SELECT t.\"id\" AS key, row_to_json(t) AS row FROM \"{}\" t WHERE t.\"id\" = ANY($1){}",
        relation.table,
        deleted_guard(relation)
    )
}

fn has_many_sql(relation: &Relation, foreign_key: &str) -> String {
    format!(
        "SELECT t.\"{fk}\" AS key, row_to_json(t) AS row FROM \"{table}\" t WHERE t.\"{fk}\" = ANY($1){guard} ORDER BY t.\"id\"",
        fk = foreign_key,
        table = relation.table,
        guard = deleted_guard(relation)
    )
}

fn many_to_many_sql(relation: &Relation, join_table: &str, owner_key: &str, target_key: &str) -> String {
    format!(
        "SELECT j.\"{owner}\" AS key, row_to_json(t) AS row FROM \"{table}\" t \
         JOIN \"{join}\" j ON j.\"{target}\" = t.\"id\" WHERE j.\"{owner}\" = ANY($1){guard} ORDER BY t.\"id\"",
        owner = owner_key,
        table = relation.table,
        join = join_table,
        target = target_key,
        guard = deleted_guard(relation)
    )
}

async fn fetch_keyed(pool: &PgPool, sql: &str, keys: &[i64]) -> Result<Vec<(i64, Value)>, DatabaseError> {
    if keys.is_empty() {
        return Ok(vec![]);
    }
    let rows = sqlx::query(sql).bind(keys.to_vec()).fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<(i64, Value), DatabaseError> {
            Ok((row.try_get::<i64, _>("key")?, row.try_get::<Value, _>("row")?))
        })
        .collect()
}

use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow};

use crate::filter::Column;

/// A persisted record type with a bigint `id` primary key.
///
/// The associated constants describe the table to the generic repository:
/// which columns may be filtered and sorted, whether rows are soft-deleted,
/// and which relationships can be eager-loaded by name.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];
    /// Singular label used in messages, e.g. "Ticket"
    const LABEL: &'static str;
    const SOFT_DELETE: bool = false;
    const HAS_UPDATED_AT: bool = true;
    const RELATIONS: &'static [Relation] = &[];

    fn id(&self) -> i64;

    fn relation(name: &str) -> Option<&'static Relation> {
        Self::RELATIONS.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The owner row holds `foreign_key` pointing at the target's id
    BelongsTo { foreign_key: &'static str },
    /// Target rows hold `foreign_key` pointing at the owner's id
    HasMany { foreign_key: &'static str },
    /// Linked through `join_table(owner_key, target_key)`
    ManyToMany {
        join_table: &'static str,
        owner_key: &'static str,
        target_key: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub table: &'static str,
    pub kind: RelationKind,
    /// Skip target rows carrying a `deleted_at` marker
    pub soft_delete: bool,
}

impl Relation {
    pub const fn belongs_to(name: &'static str, table: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            table,
            kind: RelationKind::BelongsTo { foreign_key },
            soft_delete: false,
        }
    }

    pub const fn has_many(name: &'static str, table: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            table,
            kind: RelationKind::HasMany { foreign_key },
            soft_delete: false,
        }
    }

    pub const fn many_to_many(
        name: &'static str,
        table: &'static str,
        join_table: &'static str,
        owner_key: &'static str,
        target_key: &'static str,
    ) -> Self {
        Self {
            name,
            table,
            kind: RelationKind::ManyToMany { join_table, owner_key, target_key },
            soft_delete: false,
        }
    }

    pub const fn soft_deleted(self) -> Self {
        Self { soft_delete: true, ..self }
    }
}

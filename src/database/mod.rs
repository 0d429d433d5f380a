pub mod changeset;
pub mod entity;
pub mod manager;
pub mod models;
pub mod preload;
pub mod query_builder;
pub mod repository;

pub use changeset::Changeset;
pub use entity::{Entity, Relation, RelationKind};
pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{parse_id, DeleteConfirmation, Paginated, Repository};

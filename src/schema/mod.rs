//! Request payload shapes.
//!
//! Create schemas are validated, then turned into an insert [`Changeset`]
//! inside the create transaction. Patch schemas carry only the fields the
//! client sent; nullable columns use `Option<Option<T>>` so that an explicit
//! `null` clears the column while an absent key leaves it alone.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::PgConnection;
use validator::{Validate, ValidationError};

use crate::database::{Changeset, DatabaseError};
use crate::middleware::AuthUser;

pub mod auth;
pub mod organization;
pub mod project;
pub mod ticket;
pub mod user;

/// Payload accepted by a Create operation for entity `E`
#[async_trait]
pub trait CreateSchema<E>: Validate + Send + Sync {
    /// Column assignments for the new row
    async fn changeset(&self, conn: &mut PgConnection, actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError>;

    /// Dependent rows written in the same transaction after the insert
    async fn after_insert(&self, _conn: &mut PgConnection, _created: &E, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Payload accepted by UpdateByID / UpdateByClaims
pub trait PatchSchema: Validate + Send + Sync {
    fn changeset(&self) -> Changeset;
}

pub(crate) static UPPERCASE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9]*$").unwrap());
pub(crate) static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());
pub(crate) static ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

pub(crate) fn require_actor(actor: Option<&AuthUser>) -> Result<&AuthUser, DatabaseError> {
    actor.ok_or_else(|| DatabaseError::Internal("an authenticated user is required".to_string()))
}

pub(crate) fn one_of(value: &str, allowed: &[&str], code: &'static str) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(format!("must be one of: {}", allowed.join(", "))));
    Err(err)
}

pub(crate) fn dates_in_order(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    message: &'static str,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => {
            let mut err = ValidationError::new("date_order");
            err.message = Some(Cow::Borrowed(message));
            Err(err)
        }
        _ => Ok(()),
    }
}

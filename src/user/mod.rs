mod memory;
mod postgres;
mod service;
mod store;
mod validation;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;
pub use service::UserService;
pub use store::{Field, StoreError, UserStore};
pub use validation::{Mode, NormalizedUser, UserPayload, UserValidator, taken};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User as saved on database.
///
/// Serializes to `{id, name, nickname, email}` in that order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub nickname: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

/// Validated data for a user about to be inserted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub nickname: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password: String,
}

/// Validated replacement for the mutable fields of a [`User`].
#[derive(Clone, Debug, PartialEq)]
pub struct UserChanges {
    pub name: String,
    pub nickname: String,
    pub email: String,
}

//! Persistence port for users.

use std::fmt;

use async_trait::async_trait;

use crate::user::{NewUser, User, UserChanges};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by a [`UserStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    /// A unique constraint rejected the write.
    #[error("{field} is already used by another user")]
    Conflict { field: Field },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Columns carrying a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Nickname,
    Email,
}

impl Field {
    /// Column and payload key for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Nickname => "nickname",
            Field::Email => "email",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Port for user persistence.
///
/// Implementations must enforce nickname and email uniqueness themselves:
/// a write that would duplicate either one fails with
/// [`StoreError::Conflict`], whatever the caller checked beforehand.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by its `id`.
    async fn find_by_id(&self, id: i64) -> Result<User>;

    /// Whether a user other than `exclude_id` holds `value` in `field`.
    async fn exists_by_field(
        &self,
        field: Field,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool>;

    /// Insert a user and return it with its assigned `id`.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Replace the mutable fields of user `id`.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User>;
}

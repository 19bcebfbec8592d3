//! Process-local user store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::store::{Field, Result, StoreError, UserStore};
use crate::user::{NewUser, User, UserChanges};

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    users: BTreeMap<i64, User>,
}

impl Inner {
    fn holder(&self, field: Field, value: &str) -> Option<i64> {
        self.users
            .values()
            .find(|user| match field {
                Field::Nickname => user.nickname == value,
                Field::Email => user.email == value,
            })
            .map(|user| user.id)
    }

    /// Whether `value` is held by a user other than `owner`.
    fn held_by_other(&self, field: Field, value: &str, owner: Option<i64>) -> bool {
        self.holder(field, value).is_some_and(|id| Some(id) != owner)
    }

    /// First unique field of `nickname`/`email` already held by someone
    /// other than `owner`.
    fn conflict(
        &self,
        nickname: &str,
        email: &str,
        owner: Option<i64>,
    ) -> Option<Field> {
        [(Field::Nickname, nickname), (Field::Email, email)]
            .into_iter()
            .find(|(field, value)| self.held_by_other(*field, value, owner))
            .map(|(field, _)| field)
    }
}

/// In-memory [`UserStore`].
///
/// Uniqueness check and write happen under the same lock, so concurrent
/// writers cannot both claim a nickname.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

impl MemoryUserStore {
    /// Create an empty [`MemoryUserStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: i64) -> Result<User> {
        self.inner
            .lock()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn exists_by_field(
        &self,
        field: Field,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.held_by_other(field, value, exclude_id))
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.lock().await;

        if let Some(field) = inner.conflict(&user.nickname, &user.email, None) {
            return Err(StoreError::Conflict { field });
        }

        // Ids are never reused: the counter only moves forward.
        inner.last_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.last_id,
            name: user.name,
            nickname: user.nickname,
            email: user.email,
            password: user.password,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let mut inner = self.inner.lock().await;

        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if let Some(field) =
            inner.conflict(&changes.nickname, &changes.email, Some(id))
        {
            return Err(StoreError::Conflict { field });
        }

        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.name = changes.name;
        user.nickname = changes.nickname;
        user.email = changes.email;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}

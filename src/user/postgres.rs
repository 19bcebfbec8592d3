//! Handle database requests.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::store::{Field, Result, StoreError, UserStore};
use crate::user::{NewUser, User, UserChanges};

const NICKNAME_CONSTRAINT: &str = "users_nickname_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

const RETURNING: &str =
    "RETURNING id, name, nickname, email, password, created_at, updated_at";

/// PostgreSQL [`UserStore`].
///
/// Uniqueness is guaranteed by the `users_nickname_key` and
/// `users_email_key` constraints.
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool<Postgres>,
}

impl PgUserStore {
    /// Create a new [`PgUserStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

impl Field {
    /// Field guarded by a named unique constraint.
    fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            NICKNAME_CONSTRAINT => Some(Field::Nickname),
            EMAIL_CONSTRAINT => Some(Field::Email),
            _ => None,
        }
    }
}

/// Turn unique violations into [`StoreError::Conflict`].
fn map_write_error(err: sqlx::Error) -> StoreError {
    let field = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .and_then(|db| db.constraint())
        .and_then(Field::from_constraint);

    match field {
        Some(field) => StoreError::Conflict { field },
        None => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, name, nickname, email, password, created_at, updated_at
                FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn exists_by_field(
        &self,
        field: Field,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let query = format!(
            r#"SELECT EXISTS(
                SELECT 1 FROM users
                WHERE {field} = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )"#
        );

        Ok(sqlx::query_scalar::<_, bool>(&query)
            .bind(value)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let query = format!(
            r#"INSERT INTO users (name, nickname, email, password)
                VALUES ($1, $2, $3, $4) {RETURNING}"#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.name)
            .bind(&user.nickname)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let query = format!(
            r#"UPDATE users
                SET name = $2, nickname = $3, email = $4, updated_at = NOW()
                WHERE id = $1 {RETURNING}"#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.nickname)
            .bind(&changes.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(StoreError::NotFound)
    }
}

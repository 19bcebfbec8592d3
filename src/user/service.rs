use std::sync::Arc;

use crate::crypto::PasswordManager;
use crate::error::{Result, ServerError};
use crate::user::{
    Mode, NewUser, User, UserChanges, UserPayload, UserStore, UserValidator,
};

/// User manager.
#[derive(Clone)]
pub struct UserService {
    pub store: Arc<dyn UserStore>,
    pub validator: Arc<UserValidator>,
    pub crypto: Arc<PasswordManager>,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(
        store: Arc<dyn UserStore>,
        validator: UserValidator,
        crypto: Arc<PasswordManager>,
    ) -> Self {
        Self {
            store,
            validator: Arc::new(validator),
            crypto,
        }
    }

    /// Find a user using `id` field.
    pub async fn find_by_id(&self, id: i64) -> Result<User> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Validate, hash password and insert a new user.
    pub async fn create(&self, payload: UserPayload) -> Result<User> {
        let user = self
            .validator
            .validate(self.store.as_ref(), payload, Mode::Create)
            .await?;

        let Some(password) = user.password else {
            return Err(ServerError::Internal {
                details: "validated user has no password".into(),
                source: None,
            });
        };

        // Argon2 is CPU-bound.
        let crypto = Arc::clone(&self.crypto);
        let password = tokio::task::spawn_blocking(move || {
            crypto.hash_password(password)
        })
        .await
        .map_err(|err| ServerError::Internal {
            details: "password hashing task failed".into(),
            source: Some(Box::new(err)),
        })??;

        let user = self
            .store
            .create(NewUser {
                name: user.name,
                nickname: user.nickname,
                email: user.email,
                password,
            })
            .await?;

        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Validate and replace `name`, `nickname` and `email` of user `id`.
    pub async fn update(&self, id: i64, payload: UserPayload) -> Result<User> {
        // Unknown users are a 404, not a validation failure.
        self.store.find_by_id(id).await?;

        let user = self
            .validator
            .validate(self.store.as_ref(), payload, Mode::Update(id))
            .await?;

        let user = self
            .store
            .update(
                id,
                UserChanges {
                    name: user.name,
                    nickname: user.nickname,
                    email: user.email,
                },
            )
            .await?;

        tracing::info!(user_id = user.id, "user updated");
        Ok(user)
    }
}

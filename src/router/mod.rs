pub mod status;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::ServerError;

/// JSON body whose rejections use the [`ServerError`] envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Numeric `{user_id}` path segment.
pub struct UserId(pub i64);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await?;
        Ok(Self(id))
    }
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub fn state(store: std::sync::Arc<dyn crate::user::UserStore>) -> crate::AppState {
    use std::sync::Arc;

    use crate::config::{Argon2, Configuration, Storage};
    use crate::crypto::{DefaultPolicy, PasswordManager};
    use crate::user::{UserService, UserValidator};

    let mut config = Configuration::default();
    config.storage = Storage::Memory;
    // Cheapest accepted parameters, tests only hash.
    config.argon2 = Some(Argon2 {
        memory_cost: 8,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    });

    let crypto = Arc::new(
        PasswordManager::new(config.argon2.clone()).expect("valid argon2 parameters"),
    );
    let rules = config.validation.user.clone();
    let validator =
        UserValidator::new(rules.clone(), Arc::new(DefaultPolicy::new(rules.password)));

    crate::AppState {
        config: Arc::new(config),
        users: UserService::new(store, validator, crypto),
        metrics: None,
    }
}

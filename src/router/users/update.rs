//! Replace user data.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::Result;
use crate::router::{JsonBody, UserId};
use crate::user::{User, UserPayload};

pub async fn handler(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    JsonBody(body): JsonBody<UserPayload>,
) -> Result<Json<User>> {
    Ok(Json(state.users.update(user_id, body).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::router::users::tests::{json, seed};
    use crate::user::{MemoryUserStore, UserStore};
    use crate::*;

    #[tokio::test]
    async fn test_update_user_data() {
        let store = Arc::new(MemoryUserStore::new());
        let user = seed(store.as_ref(), "ann01").await;
        let app = app(router::state(store.clone()));

        let data = json!({
            "id": user.id,
            "name": "Ann Smith",
            "nickname": "annsmith",
            "email": user.email,
        });
        let path = format!("/api/users/{}", user.id);
        let response = make_request(app, Method::PUT, &path, data.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await, data);

        let stored = store.find_by_id(user.id).await.unwrap();
        assert_eq!(stored.nickname, "annsmith");
        assert_eq!(stored.name, "Ann Smith");
        assert_eq!(stored.password, user.password);
    }

    #[tokio::test]
    async fn test_update_nickname_not_unique() {
        let store = Arc::new(MemoryUserStore::new());
        let bob = seed(store.as_ref(), "bob").await;
        let carl = seed(store.as_ref(), "carl").await;
        let app = app(router::state(store.clone()));

        let data = json!({
            "id": carl.id,
            "name": carl.name,
            "nickname": bob.nickname,
            "email": carl.email,
        });
        let path = format!("/api/users/{}", carl.id);
        let response = make_request(app, Method::PUT, &path, data.to_string()).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json(response).await["errors"]["nickname"].is_array());

        assert_eq!(store.find_by_id(carl.id).await.unwrap().nickname, "carl");
    }

    #[tokio::test]
    async fn test_update_nickname_length() {
        let store = Arc::new(MemoryUserStore::new());
        let user = seed(store.as_ref(), "ann01").await;
        let state = router::state(store);
        let rule = state.config.validation.user.nickname.clone();
        let path = format!("/api/users/{}", user.id);

        for length in [rule.max + 1, rule.max + 255, rule.min - 1] {
            let data = json!({
                "id": user.id,
                "name": user.name,
                "nickname": "n".repeat(length),
                "email": user.email,
            });
            let response =
                make_request(app(state.clone()), Method::PUT, &path, data.to_string()).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert!(json(response).await["errors"]["nickname"].is_array());
        }

        for length in [rule.min, rule.max] {
            let nickname = "n".repeat(length);
            let data = json!({
                "id": user.id,
                "name": user.name,
                "nickname": nickname,
                "email": user.email,
            });
            let response =
                make_request(app(state.clone()), Method::PUT, &path, data.to_string()).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json(response).await["nickname"], nickname);
        }
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let app = app(router::state(Arc::new(MemoryUserStore::new())));

        let data = json!({
            "id": 12,
            "name": "Ann",
            "nickname": "ann01",
            "email": "ann@example.com",
        });
        let response = make_request(app, Method::PUT, "/api/users/12", data.to_string()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_cannot_change_id() {
        let store = Arc::new(MemoryUserStore::new());
        let user = seed(store.as_ref(), "ann01").await;
        let app = app(router::state(store.clone()));

        let data = json!({
            "id": user.id + 100,
            "name": user.name,
            "nickname": user.nickname,
            "email": user.email,
        });
        let path = format!("/api/users/{}", user.id);
        let response = make_request(app, Method::PUT, &path, data.to_string()).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json(response).await["errors"]["id"].is_array());

        assert_eq!(store.find_by_id(user.id).await.unwrap(), user);
    }
}

//! Users-related HTTP API.
mod create;
mod get;
mod update;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // `POST /api/users` goes to `create`.
        .route("/api/users", post(create::handler))
        // `GET /api/users/:ID` goes to `get`, `PUT` to `update`.
        .route(
            "/api/users/{user_id}",
            get(get::handler).put(update::handler),
        )
}

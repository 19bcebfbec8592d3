use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::Result;
use crate::router::JsonBody;
use crate::user::{User, UserPayload};

/// Handler to create user.
pub async fn handler(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UserPayload>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.users.create(body).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

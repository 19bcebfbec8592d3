use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::Result;
use crate::router::UserId;
use crate::user::User;

/// Handler to read a user.
pub async fn handler(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<User>> {
    Ok(Json(state.users.find_by_id(user_id).await?))
}

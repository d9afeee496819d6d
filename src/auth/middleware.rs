use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = state.auth.authenticate(req.headers()).await?;

    tracing::debug!(user_id = %auth_user.id, "Request authenticated");

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

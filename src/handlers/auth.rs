use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::{
    jwt::create_access_token,
    middleware::AuthUser,
    password::{hash_password_blocking, verify_password_blocking},
};
use crate::error::{AppError, AppResult};
use crate::models::user::{AuthResponse, NewUser, SigninRequest, SignupRequest, User, UserProfile};
use crate::AppState;

fn auth_response(user: User, state: &AppState) -> AppResult<AuthResponse> {
    let access_token = create_access_token(&user, &state.config)?;
    Ok(AuthResponse {
        user: user.into(),
        access_token,
        expires_in: state.config.jwt_access_ttl_secs,
    })
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Json<AuthResponse>> {
    body.validate()?;

    if state.users.find_user_by_login(&body.email).await?.is_some()
        || state.users.find_user_by_login(&body.username).await?.is_some()
    {
        return Err(AppError::Conflict(
            "User with this email or username already exists".into(),
        ));
    }

    let password_hash = hash_password_blocking(body.password).await?;
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| body.username.clone());

    let user = state
        .users
        .insert_user(NewUser {
            email: body.email,
            username: body.username,
            name,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    Ok(Json(auth_response(user, &state)?))
}

pub async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninRequest>,
) -> AppResult<Json<AuthResponse>> {
    body.validate()?;

    let user = state
        .users
        .find_user_by_login(&body.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password_blocking(body.password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "Sign-in with wrong password");
        return Err(AppError::Unauthorized);
    }

    Ok(Json(auth_response(user, &state)?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .users
        .find_user(auth_user.id)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}

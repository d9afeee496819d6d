use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::auth::jwt::verify_token;
use crate::auth::middleware::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::UserStore;

/// Turns request credentials into a user identity.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthUser>;
}

/// Bearer-token auth backed by our own HS256 access tokens.
pub struct JwtAuthProvider {
    config: Arc<Config>,
    users: Arc<dyn UserStore>,
}

impl JwtAuthProvider {
    pub fn new(config: Arc<Config>, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthUser> {
        let bearer = headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(AppError::Unauthorized)?;

        let token_data = verify_token(bearer.token(), &self.config)?;

        // A valid token for a deleted account is still rejected.
        let user = self
            .users
            .find_user(token_data.claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_access_token;
    use crate::config::StoreBackend;
    use crate::models::user::NewUser;
    use crate::store::MemoryStore;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn config() -> Arc<Config> {
        Arc::new(Config {
            host: "127.0.0.1".into(),
            port: 0,
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            jwt_secret: "provider-secret".into(),
            jwt_access_ttl_secs: 3600,
        })
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_authenticates_known_user() {
        let cfg = config();
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                email: "a@example.com".into(),
                username: "alice".into(),
                name: "Alice".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let provider = JwtAuthProvider::new(cfg.clone(), store);

        let token = create_access_token(&user, &cfg).unwrap();
        let auth_user = provider.authenticate(&bearer(&token)).await.unwrap();
        assert_eq!(auth_user.id, user.id);
        assert_eq!(auth_user.username, "alice");
    }

    #[tokio::test]
    async fn test_rejects_missing_and_unknown() {
        let cfg = config();
        let store = Arc::new(MemoryStore::new());
        let provider = JwtAuthProvider::new(cfg.clone(), store);

        let missing = provider.authenticate(&HeaderMap::new()).await;
        assert!(matches!(missing, Err(AppError::Unauthorized)));

        let ghost = crate::models::user::User {
            id: uuid::Uuid::new_v4(),
            email: "ghost@example.com".into(),
            username: "ghost".into(),
            name: "Ghost".into(),
            password_hash: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let token = create_access_token(&ghost, &cfg).unwrap();
        let unknown = provider.authenticate(&bearer(&token)).await;
        assert!(matches!(unknown, Err(AppError::Unauthorized)));

        let garbage = provider.authenticate(&bearer("not.a.jwt")).await;
        assert!(matches!(garbage, Err(AppError::Unauthorized)));
    }
}

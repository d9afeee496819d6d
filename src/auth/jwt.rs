use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::user::User;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn create_access_token(user: &User, config: &Config) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        exp: (now + Duration::seconds(config.jwt_access_ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create access token: {}", e)))
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn config(secret: &str, ttl: i64) -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 0,
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            jwt_secret: secret.into(),
            jwt_access_ttl_secs: ttl,
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            username: "alice".into(),
            name: "Alice".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip_carries_identity() {
        let cfg = config("secret", 3600);
        let user = user();
        let token = create_access_token(&user, &cfg).unwrap();
        let data = verify_token(&token, &cfg).unwrap();
        assert_eq!(data.claims.sub, user.id);
        assert_eq!(data.claims.username, "alice");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token(&user(), &config("secret", 3600)).unwrap();
        let result = verify_token(&token, &config("other", 3600));
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway.
        let cfg = config("secret", -120);
        let token = create_access_token(&user(), &cfg).unwrap();
        assert!(matches!(
            verify_token(&token, &cfg),
            Err(AppError::Unauthorized)
        ));
    }
}

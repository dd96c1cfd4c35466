use actix_web::{dev::ServiceRequest, web, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{UserRow, ROLE_ADMIN},
    state::{AppState, JwtConfig},
};

/// Claims embedded in a session token. Verification recovers the email; no
/// user lookup happens here.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub exp: usize,
}

/// The caller identity recovered from a verified credential.
#[derive(Clone, Debug)]
pub struct Identity {
    pub email: String,
}

pub fn issue_token(jwt: &JwtConfig, email: &str) -> Result<String, ApiError> {
    let exp = Utc::now() + Duration::hours(jwt.ttl_hours);
    let claims = Claims {
        email: email.to_string(),
        exp: exp.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &jwt.encoding).map_err(|err| {
        log::error!("Token signing failed: {err}");
        ApiError::Unavailable
    })
}

/// Pure verification: signature and expiry only. Every failure, malformed
/// input included, maps to `Forbidden`. A missing Authorization header never
/// reaches this point; the extractor rejects it as `Unauthenticated`.
pub fn verify_token(jwt: &JwtConfig, token: &str) -> Result<Identity, ApiError> {
    let data = decode::<Claims>(token, &jwt.decoding, &Validation::default())
        .map_err(|_| ApiError::Forbidden)?;
    Ok(Identity {
        email: data.claims.email,
    })
}

/// Admin gate. Runs only after token verification; trusts the identity's
/// email without re-verifying. An absent user record is a denial, not a
/// fault: the role field must never be read off a lookup that found nothing.
pub async fn require_admin(db: &SqlitePool, identity: &Identity) -> Result<(), ApiError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT email, name, role, updated_at FROM users WHERE email = ? LIMIT 1",
    )
    .bind(&identity.email)
    .fetch_optional(db)
    .await?;

    match user {
        Some(user) if user.role == ROLE_ADMIN => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

fn state_of(req: &ServiceRequest) -> Result<web::Data<AppState>, ApiError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let state = match state_of(&req) {
        Ok(state) => state,
        Err(err) => return Err((err.into(), req)),
    };
    let identity = match verify_token(&state.jwt, credentials.token()) {
        Ok(identity) => identity,
        Err(err) => return Err((err.into(), req)),
    };
    if let Err(err) = require_admin(&state.db, &identity).await {
        return Err((err.into(), req));
    }
    req.extensions_mut().insert(identity);
    Ok(req)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig::from_secret("test-secret", 24)
    }

    #[test]
    fn verify_recovers_the_signed_email() {
        let jwt = test_config();
        let token = issue_token(&jwt, "a@x.com").unwrap();
        let identity = verify_token(&jwt, &token).unwrap();
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn verify_rejects_garbage_and_foreign_tokens() {
        let jwt = test_config();
        assert!(matches!(
            verify_token(&jwt, "not-a-token"),
            Err(ApiError::Forbidden)
        ));

        let other = JwtConfig::from_secret("other-secret", 24);
        let token = issue_token(&other, "a@x.com").unwrap();
        assert!(matches!(
            verify_token(&jwt, &token),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn verify_rejects_expired_tokens() {
        let jwt = JwtConfig::from_secret("test-secret", -2);
        let token = issue_token(&jwt, "a@x.com").unwrap();
        assert!(matches!(
            verify_token(&jwt, &token),
            Err(ApiError::Forbidden)
        ));
    }

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn identity(email: &str) -> Identity {
        Identity {
            email: email.to_string(),
        }
    }

    #[actix_web::test]
    async fn require_admin_denies_an_absent_user_record() {
        let pool = test_pool().await;
        let result = require_admin(&pool, &identity("ghost@x.com")).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[actix_web::test]
    async fn require_admin_denies_a_non_admin_role() {
        let pool = test_pool().await;
        crate::db::upsert_user(&pool, "user@x.com", &crate::models::UserProfile { name: None })
            .await
            .unwrap();
        let result = require_admin(&pool, &identity("user@x.com")).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[actix_web::test]
    async fn require_admin_admits_an_admin_role() {
        let pool = test_pool().await;
        crate::db::upsert_user(&pool, "boss@x.com", &crate::models::UserProfile { name: None })
            .await
            .unwrap();
        crate::db::promote_user(&pool, "boss@x.com").await.unwrap();
        assert!(require_admin(&pool, &identity("boss@x.com")).await.is_ok());
    }

    #[actix_web::test]
    async fn upsert_preserves_an_existing_admin_role() {
        let pool = test_pool().await;
        crate::db::upsert_user(&pool, "boss@x.com", &crate::models::UserProfile { name: None })
            .await
            .unwrap();
        crate::db::promote_user(&pool, "boss@x.com").await.unwrap();

        let stored = crate::db::upsert_user(
            &pool,
            "boss@x.com",
            &crate::models::UserProfile {
                name: Some("Boss".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(stored.role, ROLE_ADMIN);
        assert_eq!(stored.name.as_deref(), Some("Boss"));
    }
}

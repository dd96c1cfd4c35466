use jsonwebtoken::{DecodingKey, EncodingKey};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt: JwtConfig,
    pub payments: PaymentConfig,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl_hours: i64,
}

impl JwtConfig {
    pub fn from_secret(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub api_url: String,
    pub secret_key: String,
}

impl PaymentConfig {
    pub fn enabled(&self) -> bool {
        !(self.api_url.trim().is_empty() || self.secret_key.trim().is_empty())
    }
}

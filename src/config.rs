use serde::Deserialize;

/// Token signing parameters. Loaded once at startup and never rotated.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            secret_key: std::env::var("SECRET_KEY")
                .unwrap_or_else(|_| "dev-secret-change-me".into()),
            algorithm: std::env::var("ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            access_token_expire_minutes: std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 12),
        };
        Ok(Self { database_url, auth })
    }
}

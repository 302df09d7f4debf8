use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::AuthConfig;

/// Wire payload of an access token: the subject id (as a string) and an
/// absolute expiry timestamp.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

/// Signing and verification keys plus the token lifetime. Built once from
/// config; there is no revocation — a token stays valid until it expires.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &AuthConfig) -> anyhow::Result<Self> {
        let algorithm: Algorithm = cfg
            .algorithm
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown signing algorithm: {}", cfg.algorithm))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret_key.as_bytes()),
            algorithm,
            access_ttl: Duration::minutes(cfg.access_token_expire_minutes),
        })
    }

    pub fn issue(&self, user_id: i64) -> anyhow::Result<String> {
        let exp = OffsetDateTime::now_utc() + self.access_ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(%user_id, "access token issued");
        Ok(token)
    }

    /// Returns the subject id exactly as encoded. Fails on a bad signature,
    /// a malformed token, a non-numeric subject, or an elapsed expiry.
    pub fn verify(&self, token: &str) -> Result<i64, InvalidToken> {
        let validation = Validation::new(self.algorithm);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|_| InvalidToken)?;
        data.claims.sub.parse::<i64>().map_err(|_| InvalidToken)
    }
}

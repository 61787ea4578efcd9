//! Mobile-client bearer tokens
//!
//! The auth service (external collaborator) issues these; the core only
//! needs to verify them and extract the client id.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "evgrid-ocpp";

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours: 24,
        }
    }
}

/// Claims of a mobile-client token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientClaims {
    /// Client id
    pub sub: String,
    /// Normalised phone
    pub phone: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl ClientClaims {
    pub fn new(client_id: Uuid, phone: &str, config: &JwtConfig) -> Self {
        let now = Utc::now();
        Self {
            sub: client_id.to_string(),
            phone: phone.to_string(),
            exp: (now + Duration::hours(config.expiration_hours)).timestamp(),
            iat: now.timestamp(),
            iss: ISSUER.to_string(),
        }
    }

    pub fn client_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

pub fn create_token(
    client_id: Uuid,
    phone: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = ClientClaims::new(client_id, phone, config);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<ClientClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);
    let data = decode::<ClientClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let config = JwtConfig::new("test-secret");
        let client_id = Uuid::new_v4();
        let token = create_token(client_id, "996555123456", &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.client_id(), Some(client_id));
        assert_eq!(claims.phone, "996555123456");
    }

    #[test]
    fn wrong_secret_rejected() {
        let config = JwtConfig::new("secret-a");
        let token = create_token(Uuid::new_v4(), "996555123456", &config).unwrap();
        let other = JwtConfig::new("secret-b");
        assert!(verify_token(&token, &other).is_err());
    }
}

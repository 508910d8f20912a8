use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::RequestScope;

use super::AppState;

/// JWT signing and validation parameters, read from the environment at
/// startup.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Access-token lifetime in minutes.
    pub access_ttl_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id (UUID, stored as string in JWT)
    pub sub: Uuid,
    pub email: String,
    /// Display name
    pub name: String,
    /// The tenant-scoping read filter consumes this claim downstream; the
    /// serialized name is part of the wire contract.
    #[serde(rename = "TenantId")]
    pub tenant_id: Uuid,
    /// Unique token id
    pub jti: Uuid,
    pub iss: String,
    pub aud: String,
    /// Unix timestamp expiry
    pub exp: u64,
}

impl Claims {
    /// The data-access scope this token authorizes.
    pub fn scope(&self) -> RequestScope {
        RequestScope::for_user(self.sub, self.tenant_id)
    }
}

pub fn encode_jwt(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn decode_jwt(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_ref()),
        &validation,
    )?;
    Ok(data.claims)
}

fn extract_bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Extractor: validates Bearer token (any authenticated user).
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = extract_bearer(parts).ok_or((
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Authorization header",
        ))?;

        let claims = decode_jwt(token, &state.jwt)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthClaims(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-jwt-secret-key-32-chars-pad".to_string(),
            issuer: "tenantbase".to_string(),
            audience: "tenantbase".to_string(),
            access_ttl_minutes: 60,
        }
    }

    fn test_claims(config: &JwtConfig, exp: u64) -> Claims {
        Claims {
            sub: Uuid::now_v7(),
            email: "alice@acme.com".to_string(),
            name: "Alice Smith".to_string(),
            tenant_id: Uuid::now_v7(),
            jti: Uuid::new_v4(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            exp,
        }
    }

    #[test]
    fn round_trip_preserves_claims() {
        let config = test_config();
        let claims = test_claims(&config, (Utc::now().timestamp() as u64) + 3600);

        let token = encode_jwt(&claims, &config.secret).unwrap();
        let decoded = decode_jwt(&token, &config).unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.tenant_id, claims.tenant_id);
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.email, claims.email);
    }

    #[test]
    fn tenant_claim_serializes_as_tenant_id_contract_name() {
        let config = test_config();
        let claims = test_claims(&config, (Utc::now().timestamp() as u64) + 3600);

        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.get("TenantId").is_some());
        assert!(value.get("tenant_id").is_none());
    }

    #[test]
    fn wrong_audience_rejected() {
        let config = test_config();
        let mut claims = test_claims(&config, (Utc::now().timestamp() as u64) + 3600);
        claims.aud = "someone-else".to_string();

        let token = encode_jwt(&claims, &config.secret).unwrap();
        assert!(decode_jwt(&token, &config).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let config = test_config();
        // Past the default validation leeway.
        let claims = test_claims(&config, (Utc::now().timestamp() as u64) - 600);

        let token = encode_jwt(&claims, &config.secret).unwrap();
        assert!(decode_jwt(&token, &config).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let config = test_config();
        let claims = test_claims(&config, (Utc::now().timestamp() as u64) + 3600);

        let token = encode_jwt(&claims, "another-secret-entirely-32-chars").unwrap();
        assert!(decode_jwt(&token, &config).is_err());
    }
}

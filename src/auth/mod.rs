pub mod google;
pub mod provider;
pub mod shared_secret;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use google::GoogleIdentityProvider;
pub use provider::{Identity, IdentityProvider, SignInError};
pub use shared_secret::SharedSecretIdentityProvider;

const SESSION_ISSUER: &str = "image-gallery";

/// Longest session lifetime handed out, whatever the configuration asks for
pub const MAX_SESSION_HOURS: u64 = 24 * 366;

/// Claims carried by the session token handed out at sign-in
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    pub name: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(email: String, name: String, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let hours = expiry_hours.clamp(1, MAX_SESSION_HOURS) as i64;
        let exp = (now + Duration::hours(hours)).timestamp();

        Self {
            sub: email,
            name,
            iss: SESSION_ISSUER.to_string(),
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Identity of the signed-in user for the duration of one request.
///
/// Built from a verified session token and passed explicitly to every
/// operation that acts on behalf of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub email: String,
    pub display_name: String,
}

impl From<Claims> for SessionContext {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.sub,
            display_name: claims.name,
        }
    }
}

impl From<&Identity> for SessionContext {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    InvalidSecret,
}

/// Session token freshly issued at sign-in
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_in: i64,
}

/// Signs and verifies session tokens with the configured HS256 secret
#[derive(Clone)]
pub struct SessionKeys {
    secret: String,
    expiry_hours: u64,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn issue(&self, session: &SessionContext) -> Result<IssuedSession, SessionError> {
        if self.secret.is_empty() {
            return Err(SessionError::InvalidSecret);
        }

        let claims = Claims::new(session.email.clone(), session.display_name.clone(), self.expiry_hours);
        let expires_in = claims.exp - claims.iat;
        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());

        let token = encode(&Header::default(), &claims, &encoding_key)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))?;

        Ok(IssuedSession { token, expires_in })
    }

    pub fn verify(&self, token: &str) -> Result<SessionContext, SessionError> {
        if self.secret.is_empty() {
            return Err(SessionError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims.into())
    }
}

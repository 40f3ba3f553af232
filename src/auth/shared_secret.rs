use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::provider::{display_name_or_email, Identity, IdentityProvider, SignInError};

/// Claims expected in an HS256 ID token
#[derive(Debug, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
}

/// Identity provider that trusts ID tokens signed with a shared HS256 secret.
///
/// Meant for development and tests, where a real interactive provider is not
/// available. Tokens must carry the configured issuer and audience.
pub struct SharedSecretIdentityProvider {
    secret: String,
    issuer: String,
    audience: String,
}

impl SharedSecretIdentityProvider {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation
    }
}

#[async_trait]
impl IdentityProvider for SharedSecretIdentityProvider {
    fn name(&self) -> &'static str {
        "shared-secret"
    }

    async fn sign_in(&self, assertion: &str) -> Result<Identity, SignInError> {
        if self.secret.is_empty() {
            return Err(SignInError::provider_unavailable("identity secret not configured"));
        }

        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let data = decode::<IdTokenClaims>(assertion, &key, &self.validation()).map_err(|e| {
            let code = match e.kind() {
                ErrorKind::ExpiredSignature => "auth/id-token-expired",
                ErrorKind::InvalidAudience => "auth/audience-mismatch",
                ErrorKind::InvalidIssuer => "auth/issuer-mismatch",
                _ => "auth/invalid-credential",
            };
            SignInError::new(code, e.to_string())
        })?;

        let claims = data.claims;
        if claims.email.trim().is_empty() {
            return Err(SignInError::invalid_credential("ID token carries no email"));
        }

        Ok(Identity {
            display_name: display_name_or_email(claims.name, &claims.email),
            email: claims.email,
            access_token: assertion.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, aud: &str, exp_offset: i64) -> String {
        let claims = IdTokenClaims {
            email: "a@x.com".to_string(),
            name: Some("A".to_string()),
            iss: "issuer".to_string(),
            aud: aud.to_string(),
            exp: Utc::now().timestamp() + exp_offset,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn provider() -> SharedSecretIdentityProvider {
        SharedSecretIdentityProvider::new("secret", "issuer", "gallery")
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let assertion = token("secret", "gallery", 600);
        let identity = provider().sign_in(&assertion).await.unwrap();
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(identity.display_name, "A");
        assert_eq!(identity.access_token, assertion);
    }

    #[tokio::test]
    async fn wrong_audience_is_reported() {
        let err = provider().sign_in(&token("secret", "other", 600)).await.unwrap_err();
        assert_eq!(err.code, "auth/audience-mismatch");
    }

    #[tokio::test]
    async fn expired_token_is_reported() {
        let err = provider().sign_in(&token("secret", "gallery", -3600)).await.unwrap_err();
        assert_eq!(err.code, "auth/id-token-expired");
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let err = provider().sign_in(&token("forged", "gallery", 600)).await.unwrap_err();
        assert_eq!(err.code, "auth/invalid-credential");
    }
}

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{display_name_or_email, Identity, IdentityProvider, SignInError};

/// Subset of the Google token-info response we rely on.
/// Google encodes every value as a string, booleans included.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    iss: Option<String>,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

/// Verifies Google ID tokens through the token-info endpoint
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    client_id: String,
    issuer: String,
    tokeninfo_url: String,
}

impl GoogleIdentityProvider {
    pub fn new(
        client_id: impl Into<String>,
        issuer: impl Into<String>,
        tokeninfo_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            client_id: client_id.into(),
            issuer: issuer.into(),
            tokeninfo_url: tokeninfo_url.into(),
        })
    }

    /// Google issues `accounts.google.com` with and without the scheme
    fn issuer_matches(&self, iss: Option<&str>) -> bool {
        let expected = self.issuer.trim_start_matches("https://");
        iss.map(|iss| iss.trim_start_matches("https://") == expected)
            .unwrap_or(false)
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn sign_in(&self, assertion: &str) -> Result<Identity, SignInError> {
        if self.client_id.is_empty() {
            return Err(SignInError::provider_unavailable("Google client id not configured"));
        }

        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", assertion)])
            .send()
            .await
            .map_err(|e| SignInError::provider_unavailable(format!("token-info request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(SignInError::invalid_credential(format!("token-info rejected the ID token ({})", status))
                .with_credential(assertion));
        }
        if !status.is_success() {
            return Err(SignInError::provider_unavailable(format!("token-info returned {}", status)));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| SignInError::provider_unavailable(format!("malformed token-info response: {}", e)))?;

        let email = info
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| SignInError::invalid_credential("ID token carries no email"))?;

        if info.aud.as_deref() != Some(self.client_id.as_str()) {
            return Err(SignInError::new("auth/audience-mismatch", "ID token was issued for another client")
                .with_email(email));
        }

        if !self.issuer_matches(info.iss.as_deref()) {
            return Err(SignInError::new("auth/issuer-mismatch", "ID token was issued by another provider")
                .with_email(email));
        }

        if info.email_verified.as_deref() != Some("true") {
            return Err(SignInError::new("auth/unverified-email", "email address is not verified")
                .with_email(email));
        }

        Ok(Identity {
            display_name: display_name_or_email(info.name, &email),
            email,
            access_token: assertion.to_string(),
        })
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity asserted by the provider after a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub display_name: String,
    /// Provider credential the identity was derived from
    #[serde(skip_serializing)]
    pub access_token: String,
}

/// Rejected sign-in, shaped after the provider's own error descriptor
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct SignInError {
    pub code: String,
    pub message: String,
    /// Email of the account the sign-in was attempted for, when known
    pub email: Option<String>,
    /// Credential that was presented, when the provider echoes it back
    pub credential: Option<String>,
}

impl SignInError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            email: None,
            credential: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::new("auth/invalid-credential", message)
    }

    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::new("auth/provider-unavailable", message)
    }
}

/// Exchanges a provider assertion (ID token) for a verified identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &'static str;

    async fn sign_in(&self, assertion: &str) -> Result<Identity, SignInError>;
}

/// Display names fall back to the email when the provider has none
pub(crate) fn display_name_or_email(name: Option<String>, email: &str) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_display_name_falls_back_to_email() {
        assert_eq!(display_name_or_email(None, "a@x.com"), "a@x.com");
        assert_eq!(display_name_or_email(Some("  ".into()), "a@x.com"), "a@x.com");
        assert_eq!(display_name_or_email(Some(" A ".into()), "a@x.com"), "A");
    }

    #[test]
    fn sign_in_error_displays_code_and_message() {
        let err = SignInError::invalid_credential("bad token").with_email("a@x.com");
        assert_eq!(err.to_string(), "auth/invalid-credential: bad token");
        assert_eq!(err.email.as_deref(), Some("a@x.com"));
    }
}

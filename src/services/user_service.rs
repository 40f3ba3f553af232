use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::{Identity, SessionContext};
use crate::documents::{CollectionPath, DocumentError, DocumentRef, DocumentStore};

const USERS_COLLECTION: &str = "users";
const IMAGES_COLLECTION: &str = "images";

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),
    #[error("Document store error: {0}")]
    Documents(#[from] DocumentError),
}

/// Outcome of making sure a user record exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Registration {
    Created,
    Existing,
}

/// Stored user record, keyed by email
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// `users/{email}`
pub fn user_document(email: &str) -> Result<DocumentRef, UserError> {
    if email.trim().is_empty() || !email.contains('@') || email.contains('/') {
        return Err(UserError::InvalidEmail(email.to_string()));
    }
    Ok(CollectionPath::root(USERS_COLLECTION)?.doc(email)?)
}

/// `users/{email}/images`
pub fn user_images(email: &str) -> Result<CollectionPath, UserError> {
    Ok(user_document(email)?.collection(IMAGES_COLLECTION)?)
}

pub struct UserService {
    documents: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Creates the user record on first sign-in. Never touches an existing one.
    pub async fn ensure_registered(&self, identity: &Identity) -> Result<Registration, UserError> {
        let doc = user_document(&identity.email)?;
        let data = json!({
            "name": identity.display_name,
            "created_at": Utc::now(),
        });

        if self.documents.create_if_absent(&doc, data).await? {
            info!("Registered new user {}", identity.email);
            Ok(Registration::Created)
        } else {
            debug!("User {} already registered", identity.email);
            Ok(Registration::Existing)
        }
    }

    pub async fn profile(&self, session: &SessionContext) -> Result<Option<UserRecord>, UserError> {
        let doc = user_document(&session.email)?;
        Ok(self.documents.get(&doc).await?.map(|record| UserRecord {
            email: record.id.clone(),
            name: record.get_str("name").unwrap_or_default().to_string(),
            created_at: record.created_at,
        }))
    }
}

use std::fmt::{Debug, Formatter};

use emcsign_core::{utils::Redact, SigningCredential};

/// Credential for the S3 head.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id, the object user name.
    pub access_key_id: String,
    /// Secret access key, used as raw bytes for the HMAC key.
    pub secret_access_key: String,
}

impl Credential {
    /// Create a credential.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

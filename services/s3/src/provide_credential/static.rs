use emcsign_core::{Context, ProvideCredential, Result};

use crate::Credential;

/// StaticCredentialProvider provides a fixed access key pair.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    access_key_id: String,
    secret_access_key: String,
}

impl StaticCredentialProvider {
    /// Create a new StaticCredentialProvider.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
        }
    }
}

impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(Credential::new(
            &self.access_key_id,
            &self.secret_access_key,
        )))
    }
}

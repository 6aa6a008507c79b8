use emcsign_core::{Context, ProvideCredential, Result};

use crate::Credential;

/// StaticCredentialProvider provides a fixed Atmos credential.
///
/// The secret is decoded when the provider is asked for a credential, so a
/// malformed secret fails the first signing with `ConfigInvalid`.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    uid: String,
    secret: String,
}

impl StaticCredentialProvider {
    /// Create a new StaticCredentialProvider with a token id and a base64 secret.
    pub fn new(uid: &str, secret: &str) -> Self {
        Self {
            uid: uid.to_string(),
            secret: secret.to_string(),
        }
    }
}

impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(Credential::new(&self.uid, &self.secret)?))
    }
}

use std::sync::Arc;

use emcsign_core::{Context, ProvideCredential, Result};

use crate::config::Config;
use crate::credential::Credential;

/// ConfigCredentialProvider will load credential from config, falling back to env.
#[derive(Debug)]
pub struct ConfigCredentialProvider {
    config: Arc<Config>,
}

impl ConfigCredentialProvider {
    /// Create a new loader via config.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl ProvideCredential for ConfigCredentialProvider {
    type Credential = Credential;

    fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let config = self.config.as_ref().clone().from_env(ctx);

        match (&config.access_key_id, &config.secret_access_key) {
            (Some(ak), Some(sk)) => Ok(Some(Credential::new(ak, sk))),
            _ => Ok(None),
        }
    }
}

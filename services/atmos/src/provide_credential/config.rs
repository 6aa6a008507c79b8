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

        match (&config.uid, &config.secret) {
            (Some(uid), Some(secret)) => Ok(Some(Credential::new(uid, secret)?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use emcsign_core::{ErrorKind, StaticEnv};

    #[test]
    fn test_config_wins_over_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        let ctx = Context::new().with_env(StaticEnv::from_pairs([
            (ATMOS_UID, "env-uid"),
            (ATMOS_SECRET, "ZW52"),
        ]));
        let config = Arc::new(Config::new().with_uid("abc").with_secret("czNjcjN0"));

        let cred = ConfigCredentialProvider::new(config)
            .provide_credential(&ctx)
            .expect("load must succeed")
            .expect("credential must exist");
        assert_eq!(cred.uid, "abc");
        assert_eq!(cred.secret, b"s3cr3t");
    }

    #[test]
    fn test_partial_config_uses_env() {
        let ctx = Context::new().with_env(StaticEnv::from_pairs([(ATMOS_SECRET, "czNjcjN0")]));
        let config = Arc::new(Config::new().with_uid("abc"));

        let cred = ConfigCredentialProvider::new(config)
            .provide_credential(&ctx)
            .unwrap()
            .unwrap();
        assert_eq!(cred.secret, b"s3cr3t");
    }

    #[test]
    fn test_bad_secret_is_config_error() {
        let config = Arc::new(Config::new().with_uid("abc").with_secret("%%%"));
        let err = ConfigCredentialProvider::new(config)
            .provide_credential(&Context::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}

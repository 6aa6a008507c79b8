use emcsign_core::{Context, ProvideCredential, Result};

use crate::{constants::*, Credential};

/// EnvCredentialProvider loads Atmos credentials from environment variables.
///
/// This provider looks for the following environment variables:
/// - `ATMOS_UID`: the token id, `subtenant/user`
/// - `ATMOS_SECRET`: the base64 encoded shared secret
#[derive(Debug, Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let envs = ctx.env_vars();

        match (envs.get(ATMOS_UID), envs.get(ATMOS_SECRET)) {
            (Some(uid), Some(secret)) => Ok(Some(Credential::new(uid, secret)?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emcsign_core::StaticEnv;

    #[test]
    fn test_env_credential_provider() -> emcsign_core::Result<()> {
        let ctx = Context::new().with_env(StaticEnv::from_pairs([
            (ATMOS_UID, "subtenant/user1"),
            (ATMOS_SECRET, "czNjcjN0"),
        ]));

        let cred = EnvCredentialProvider::new().provide_credential(&ctx)?;
        let cred = cred.expect("credential must be loaded");
        assert_eq!(cred.uid, "subtenant/user1");
        assert_eq!(cred.secret, b"s3cr3t");

        Ok(())
    }

    #[test]
    fn test_env_credential_provider_missing_credentials() -> emcsign_core::Result<()> {
        let cred = EnvCredentialProvider::new().provide_credential(&Context::new())?;
        assert!(cred.is_none());

        Ok(())
    }

    #[test]
    fn test_env_credential_provider_partial_credentials() -> emcsign_core::Result<()> {
        let ctx = Context::new().with_env(StaticEnv::from_pairs([(ATMOS_UID, "abc")]));

        let cred = EnvCredentialProvider::new().provide_credential(&ctx)?;
        assert!(cred.is_none());

        Ok(())
    }
}

use emcsign_core::{Context, ProvideCredential, Result};

use crate::{constants::*, Credential};

/// EnvCredentialProvider loads S3 credentials from environment variables.
///
/// This provider looks for the following environment variables:
/// - `ECS_S3_ACCESS_KEY_ID`: the object user
/// - `ECS_S3_SECRET_ACCESS_KEY`: the secret key of that user
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

        match (
            envs.get(ECS_S3_ACCESS_KEY_ID),
            envs.get(ECS_S3_SECRET_ACCESS_KEY),
        ) {
            (Some(ak), Some(sk)) => Ok(Some(Credential::new(ak, sk))),
            _ => Ok(None),
        }
    }
}

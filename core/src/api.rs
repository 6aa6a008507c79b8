use std::fmt::Debug;

use crate::{Context, Result, SigningMethod};

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential is the trait used by signer to load the credential from the environment.
///
/// Atmos needs a token id and a base64 shared secret, while the S3 head needs an
/// access key id and a secret access key.
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this loader.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load signing credential from current env.
    ///
    /// Returns `Ok(None)` when this provider has nothing to offer.
    fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used by signer to sign the request.
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this builder.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// ## Credential
    ///
    /// `None` means no provider returned a credential; implementations must fail
    /// with `ConfigInvalid` instead of sending an unsigned request.
    ///
    /// ## Method
    ///
    /// [`SigningMethod::Query`] carries the absolute expiration of a presigned
    /// request. Implementations decide where it goes, for example Atmos puts it
    /// in the `x-emc-expires` header while S3 uses the `Expires` query.
    ///
    /// Signing must be the last change made to the headers before sending.
    fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        method: SigningMethod,
    ) -> Result<()>;
}

use std::sync::{Arc, Mutex};

use crate::{Body, Context, Layer, Next, ProvideCredential, Result, SignRequest};
use crate::{SigningCredential, SigningMethod};

/// Signer is the main struct used to sign the request.
///
/// The loaded credential is cached and shared by every clone of the signer, it is
/// only reloaded once it stops being valid.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the context of this signer.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Load the credential, using the cached one while it's valid.
    pub fn credential(&self) -> Result<Option<K>> {
        let credential = self.credential.lock().expect("lock poisoned").clone();
        if credential.is_valid() {
            return Ok(credential);
        }

        let credential = self.loader.provide_credential(&self.ctx)?;
        *self.credential.lock().expect("lock poisoned") = credential.clone();
        Ok(credential)
    }

    /// Signing request.
    pub fn sign(&self, req: &mut http::request::Parts, method: SigningMethod) -> Result<()> {
        let credential = self.credential()?;

        self.builder
            .sign_request(&self.ctx, req, credential.as_ref(), method)
    }
}

/// A signer is the outermost [`Layer`] of a pipeline: it signs the request with
/// [`SigningMethod::Header`] before handing it on.
impl<K: SigningCredential> Layer for Signer<K> {
    fn call(&self, req: http::Request<Body>, next: Next<'_>) -> Result<http::Response<Body>> {
        let (mut parts, body) = req.into_parts();
        self.sign(&mut parts, SigningMethod::Header)?;
        next.run(http::Request::from_parts(parts, body))
    }
}

use std::fmt::{Debug, Formatter};

use emcsign_core::hash::base64_decode;
use emcsign_core::{utils::Redact, Error, Result, SigningCredential};

/// Credential for atmos.
///
/// The secret is kept decoded, it's only ever used as the HMAC key.
#[derive(Clone)]
pub struct Credential {
    /// Token id, `subtenant/user`.
    pub uid: String,
    /// Decoded shared secret.
    pub secret: Vec<u8>,
}

impl Credential {
    /// Create a credential from a token id and a base64 encoded secret.
    pub fn new(uid: &str, secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(Error::config_invalid("atmos secret is empty"));
        }
        let secret = base64_decode(secret.trim())
            .map_err(|e| Error::config_invalid("atmos secret is not valid base64").with_source(e))?;
        Ok(Self {
            uid: uid.to_string(),
            secret,
        })
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("uid", &Redact::from(&self.uid))
            .field("secret", &format_args!("<{} bytes>", self.secret.len()))
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.uid.is_empty() && !self.secret.is_empty()
    }
}

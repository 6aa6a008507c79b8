use std::fmt::{Debug, Formatter};

use emcsign_core::{utils::Redact, Context};

use super::constants::*;

/// Config carries all the configuration for an Atmos endpoint.
#[derive(Clone, Default)]
pub struct Config {
    /// `endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ATMOS_ENDPOINT`]
    ///
    /// For example `http://10.0.0.1:8080`.
    pub endpoint: Option<String>,
    /// `uid` is the token id, `subtenant/user`, loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ATMOS_UID`]
    pub uid: Option<String>,
    /// `secret` is the base64 encoded shared secret, loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ATMOS_SECRET`]
    pub secret: Option<String>,
    /// `utf8` enables `x-emc-utf8` and percent encoding of metadata, loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ATMOS_UTF8`], `true` or `on`
    pub utf8: Option<bool>,
}

impl Config {
    /// Create a new Config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set uid
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Set base64 encoded secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set utf8 toggle
    pub fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = Some(utf8);
        self
    }

    /// Load config from env.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if let Some(v) = ctx.env_var(ATMOS_ENDPOINT) {
            self.endpoint.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(ATMOS_UID) {
            self.uid.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(ATMOS_SECRET) {
            self.secret.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(ATMOS_UTF8) {
            self.utf8
                .get_or_insert(matches!(v.to_ascii_lowercase().as_str(), "true" | "on" | "1"));
        }

        self
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("uid", &self.uid)
            .field("secret", &self.secret.as_ref().map(Redact::from))
            .field("utf8", &self.utf8)
            .finish()
    }
}

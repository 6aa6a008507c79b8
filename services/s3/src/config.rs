use std::fmt::{Debug, Formatter};

use emcsign_core::{utils::Redact, Context};

use super::constants::*;

/// Config carries all the configuration for an S3 compatible endpoint.
#[derive(Clone, Default)]
pub struct Config {
    /// `endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ECS_S3_ENDPOINT`]
    ///
    /// For example `http://10.0.0.1:9020`. Buckets are addressed path style.
    pub endpoint: Option<String>,
    /// `access_key_id` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ECS_S3_ACCESS_KEY_ID`]
    pub access_key_id: Option<String>,
    /// `secret_access_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ECS_S3_SECRET_ACCESS_KEY`]
    pub secret_access_key: Option<String>,
    /// `namespace` is sent as `x-emc-namespace` and will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ECS_S3_NAMESPACE`]
    pub namespace: Option<String>,
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

    /// Set access key id
    pub fn with_access_key_id(mut self, access_key_id: impl Into<String>) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self
    }

    /// Set secret access key
    pub fn with_secret_access_key(mut self, secret_access_key: impl Into<String>) -> Self {
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Set namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Load config from env.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        if let Some(v) = envs.get(ECS_S3_ENDPOINT) {
            self.endpoint.get_or_insert(v.clone());
        }
        if let Some(v) = envs.get(ECS_S3_ACCESS_KEY_ID) {
            self.access_key_id.get_or_insert(v.clone());
        }
        if let Some(v) = envs.get(ECS_S3_SECRET_ACCESS_KEY) {
            self.secret_access_key.get_or_insert(v.clone());
        }
        if let Some(v) = envs.get(ECS_S3_NAMESPACE) {
            self.namespace.get_or_insert(v.clone());
        }

        self
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id.as_ref().map(Redact::from))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(Redact::from),
            )
            .field("namespace", &self.namespace)
            .finish()
    }
}

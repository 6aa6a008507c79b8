//! ECS S3 signing and transport for emcsign.
//!
//! ECS speaks S3 with signature v2, the `Authorization: AWS key:signature` scheme,
//! and signs its own `x-emc-*` headers the same way as `x-amz-*` ones.
//!
//! ## Quick Start
//!
//! ```no_run
//! use emcsign_core::{Body, Context, OsEnv, Result};
//! use emcsign_http_send_reqwest::ReqwestHttpSend;
//! use emcsign_s3::{Client, Config};
//!
//! fn main() -> Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let config = Config::new()
//!         .with_endpoint("http://10.0.0.1:9020")
//!         .with_namespace("ns1");
//!
//!     let client = Client::new(ctx, config, ReqwestHttpSend::default())?;
//!     let req = http::Request::get("/bucket1/foo.txt").body(Body::Empty)?;
//!     let content = client.execute(req)?.into_body().collect()?;
//!     println!("read {} bytes", content.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Credential Sources
//!
//! ```bash
//! export ECS_S3_ENDPOINT=http://10.0.0.1:9020
//! export ECS_S3_ACCESS_KEY_ID=user1
//! export ECS_S3_SECRET_ACCESS_KEY=secret
//! export ECS_S3_NAMESPACE=ns1  # Optional
//! ```

mod constants;
pub use constants::{CODE_ACCESS_DENIED, CODE_SIGNATURE_DOES_NOT_MATCH, CODE_SLOW_DOWN};

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::{string_to_sign, RequestSigner};

mod provide_credential;
pub use provide_credential::*;

mod fault;
pub use fault::classify;

mod client;
pub use client::Client;

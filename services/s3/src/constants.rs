// Env values used by the s3 signer.
pub const ECS_S3_ENDPOINT: &str = "ECS_S3_ENDPOINT";
pub const ECS_S3_ACCESS_KEY_ID: &str = "ECS_S3_ACCESS_KEY_ID";
pub const ECS_S3_SECRET_ACCESS_KEY: &str = "ECS_S3_SECRET_ACCESS_KEY";
pub const ECS_S3_NAMESPACE: &str = "ECS_S3_NAMESPACE";

// Headers used in s3 requests.
pub const CONTENT_MD5: &str = "content-md5";
pub const X_AMZ_PREFIX: &str = "x-amz-";
pub const X_EMC_PREFIX: &str = "x-emc-";
pub const X_EMC_NAMESPACE: &str = "x-emc-namespace";

// Query used by presigned urls.
pub const AWS_ACCESS_KEY_ID: &str = "AWSAccessKeyId";
pub const EXPIRES: &str = "Expires";
pub const SIGNATURE: &str = "Signature";

/// Error code returned when the signature doesn't match.
pub const CODE_SIGNATURE_DOES_NOT_MATCH: &str = "SignatureDoesNotMatch";
/// Error code returned for denied requests, including expired ones.
pub const CODE_ACCESS_DENIED: &str = "AccessDenied";
/// Error code returned when the server asks clients to back off.
pub const CODE_SLOW_DOWN: &str = "SlowDown";

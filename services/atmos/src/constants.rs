// Env values used by the atmos signer.
pub const ATMOS_ENDPOINT: &str = "ATMOS_ENDPOINT";
pub const ATMOS_UID: &str = "ATMOS_UID";
pub const ATMOS_SECRET: &str = "ATMOS_SECRET";
pub const ATMOS_UTF8: &str = "ATMOS_UTF8";

// Headers used in atmos requests.
pub const X_EMC_PREFIX: &str = "x-emc-";
pub const X_EMC_DATE: &str = "x-emc-date";
pub const X_EMC_UID: &str = "x-emc-uid";
pub const X_EMC_SIGNATURE: &str = "x-emc-signature";
pub const X_EMC_EXPIRES: &str = "x-emc-expires";
pub const X_EMC_UTF8: &str = "x-emc-utf8";
pub const X_EMC_META: &str = "x-emc-meta";
pub const X_EMC_LISTABLE_META: &str = "x-emc-listable-meta";
pub const X_EMC_USER_ACL: &str = "x-emc-useracl";
pub const X_EMC_GROUP_ACL: &str = "x-emc-groupacl";
pub const X_EMC_WSCHECKSUM: &str = "x-emc-wschecksum";
pub const X_EMC_CONTENT_CHECKSUM: &str = "x-emc-content-checksum";

/// Vendor code returned when the signature doesn't match.
pub const CODE_SIGNATURE_MISMATCH: u32 = 1032;
/// Vendor code returned when the server is busy.
pub const CODE_SERVER_BUSY: &str = "1040";

/// Path used to read server information and its clock.
pub const SERVICE_PATH: &str = "/rest/service";

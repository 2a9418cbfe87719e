/**
 * Protocol-wide constants.
 *
 * Path segments and identifiers that Barista and Minerva expect verbatim.
 */

/// Path segment between the Barista location and the namespace.
pub const API_SEGMENT: &str = "api";

/// Batch endpoint used when no user token is present.
pub const ANONYMOUS_BATCH: &str = "m3Batch";

/// Batch endpoint used when a user token is present.
pub const PRIVILEGED_BATCH: &str = "m3BatchPrivileged";

/// Relation used for "enabled by" existential restrictions.
pub const ENABLED_BY: &str = "RO:0002333";

/// Relation used for "occurs in" existential restrictions.
pub const OCCURS_IN: &str = "occurs_in";

/// Message carried by envelopes synthesized after a transport failure.
pub const DEEP_MANAGER_ERROR: &str = "deep manager error";

/// Name of the JSONP callback parameter and of the wrapping function.
pub const JSONP_PARAM: &str = "callback";
pub const JSONP_CALLBACK: &str = "minerva_jsonp";

/// Client version string, derived from the `minerva_core` package version.
pub const CLIENT_VERSION: &str = concat!("minerva-rust/", env!("CARGO_PKG_VERSION"));

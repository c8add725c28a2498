//! User-Agent string for catalog requests.
//!
//! Catalog sites behind challenge pages reject bare library agents more
//! often, so the string leads with a browser-compatible token and still names
//! the tool and its version.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/subgrab";

/// Default User-Agent for catalog requests.
#[must_use]
pub(crate) fn default_catalog_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("Mozilla/5.0 (compatible; subgrab/{version}; +{PROJECT_UA_URL})")
}

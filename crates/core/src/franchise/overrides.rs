//! Manually curated franchise mappings.
//!
//! The override list is a JSON array of `{"agencyId": <int>, "franchiseNumber": <string>}`
//! kept in the secret store. A missing or malformed blob degrades to an empty
//! list so lookups fall back to the derived index.

use super::FranchiseMapping;
use crate::secrets::{MANUAL_OVERRIDES_SECRET, SecretLookup};

/// Parse the override blob.
pub fn parse_overrides(raw: &str) -> Result<Vec<FranchiseMapping>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Read and parse the override blob, empty when absent or malformed.
pub async fn load_overrides(secrets: &dyn SecretLookup) -> Vec<FranchiseMapping> {
    let Some(raw) = secrets.get_secret(MANUAL_OVERRIDES_SECRET).await else {
        tracing::debug!("no manual franchise overrides configured");
        return Vec::new();
    };

    match parse_overrides(&raw) {
        Ok(overrides) => {
            tracing::info!(count = overrides.len(), "loaded manual franchise overrides");
            overrides
        }
        Err(e) => {
            tracing::warn!(error = %e, "manual franchise overrides are malformed; ignoring them");
            Vec::new()
        }
    }
}

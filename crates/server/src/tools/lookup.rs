//! franchise_lookup tool implementation.
//!
//! Resolves one franchise number to its agency.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use franchise_core::{Error, FranchiseMapping, FranchiseResolver};

use super::json_result;

/// Input parameters for franchise_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FranchiseLookupParams {
    /// The franchise number to resolve, e.g. "1234".
    pub franchise_number: String,
}

/// Implementation of the franchise_lookup tool.
///
/// The number is matched exactly as given; surrounding whitespace is not stripped.
pub async fn lookup_impl(resolver: &FranchiseResolver, params: FranchiseLookupParams) -> Result<CallToolResult, McpError> {
    let franchise_number = params.franchise_number.as_str();
    if franchise_number.is_empty() {
        return Err(Error::InvalidInput("franchise_number cannot be empty".into()).into());
    }

    let mapping: FranchiseMapping = resolver
        .resolve_by_franchise(franchise_number)
        .await
        .ok_or_else(|| Error::NotFound(format!("no agency for franchise number {franchise_number}")))?;

    json_result(&mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{fixture, result_text};
    use franchise_core::secrets::MANUAL_OVERRIDES_SECRET;
    use franchise_core::{AgencyFranchiseEntry, MemorySecrets};

    fn params(franchise_number: &str) -> FranchiseLookupParams {
        FranchiseLookupParams { franchise_number: franchise_number.to_string() }
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let (resolver, _) = fixture(vec![AgencyFranchiseEntry::new(4321, ["1234"])], MemorySecrets::new()).await;

        let result = lookup_impl(&resolver, params("1234")).await.unwrap();
        let output: FranchiseMapping = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(output, FranchiseMapping::new(4321, "1234"));
    }

    #[tokio::test]
    async fn test_lookup_matches_exactly() {
        let (resolver, _) = fixture(vec![AgencyFranchiseEntry::new(4321, ["1234"])], MemorySecrets::new()).await;

        let err = lookup_impl(&resolver, params(" 1234 ")).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
        assert!(lookup_impl(&resolver, params("123")).await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_prefers_override() {
        let secrets = MemorySecrets::new().with(MANUAL_OVERRIDES_SECRET, r#"[{"agencyId":7,"franchiseNumber":"42"}]"#);
        let (resolver, _) = fixture(vec![AgencyFranchiseEntry::new(3, ["42"])], secrets).await;

        let result = lookup_impl(&resolver, params("42")).await.unwrap();
        let output: FranchiseMapping = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(output.agency_id, 7);
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let (resolver, _) = fixture(Vec::new(), MemorySecrets::new()).await;

        let err = lookup_impl(&resolver, params("9999")).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
        assert!(err.message.contains("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_lookup_empty_input() {
        let (resolver, _) = fixture(Vec::new(), MemorySecrets::new()).await;

        let err = lookup_impl(&resolver, params("")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}

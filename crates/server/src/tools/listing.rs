//! franchise_list and agency_list tool implementations.
//!
//! Both list the derived index only; manual overrides are not included.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use franchise_core::{AgencyFranchiseEntry, FranchiseMapping, FranchiseResolver};

use super::json_result;

/// Output structure for franchise_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FranchiseListOutput {
    /// Number of mappings returned.
    pub count: usize,
    /// Every franchise number with its agency, in ascending agency order.
    pub franchises: Vec<FranchiseMapping>,
}

/// Output structure for agency_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgencyListOutput {
    /// Number of agencies returned.
    pub count: usize,
    /// Agencies in ascending id order with their franchise numbers.
    pub agencies: Vec<AgencyFranchiseEntry>,
}

/// Implementation of the franchise_list tool.
pub fn franchise_list_impl(resolver: &FranchiseResolver) -> Result<CallToolResult, McpError> {
    let franchises = resolver.list_franchises();
    json_result(&FranchiseListOutput { count: franchises.len(), franchises })
}

/// Implementation of the agency_list tool.
pub fn agency_list_impl(resolver: &FranchiseResolver) -> Result<CallToolResult, McpError> {
    let agencies = resolver.list_agencies().into_entries();
    json_result(&AgencyListOutput { count: agencies.len(), agencies })
}

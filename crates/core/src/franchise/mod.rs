//! Franchise index types.
//!
//! The index is the canonical in-cache unit: agencies in ascending id order,
//! each with the franchise numbers discovered for it, empty agencies removed.

pub mod overrides;
pub mod snapshot;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use overrides::{load_overrides, parse_overrides};

/// Franchise numbers discovered for one agency, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgencyFranchiseEntry {
    pub agency_id: i64,
    pub franchise_numbers: Vec<String>,
}

impl AgencyFranchiseEntry {
    pub fn new<I, S>(agency_id: i64, franchise_numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { agency_id, franchise_numbers: franchise_numbers.into_iter().map(Into::into).collect() }
    }

    pub fn contains(&self, franchise_number: &str) -> bool {
        self.franchise_numbers.iter().any(|n| n == franchise_number)
    }
}

/// One franchise number mapped to one agency.
///
/// Used both for manual overrides and for the flattened franchise listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseMapping {
    pub agency_id: i64,
    pub franchise_number: String,
}

impl FranchiseMapping {
    pub fn new(agency_id: i64, franchise_number: impl Into<String>) -> Self {
        Self { agency_id, franchise_number: franchise_number.into() }
    }
}

/// Agency entries sorted ascending by id, without empty entries or repeated ids.
///
/// The only way to build one is [`FranchiseIndex::from_entries`], which
/// enforces that shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct FranchiseIndex(Vec<AgencyFranchiseEntry>);

impl FranchiseIndex {
    /// Normalize raw entries into an index.
    ///
    /// Entries without franchise numbers are dropped, the rest are sorted by
    /// agency id (stable), and a repeated agency id keeps its first entry.
    pub fn from_entries(entries: impl IntoIterator<Item = AgencyFranchiseEntry>) -> Self {
        let mut entries: Vec<_> = entries.into_iter().filter(|e| !e.franchise_numbers.is_empty()).collect();
        entries.sort_by_key(|e| e.agency_id);
        entries.dedup_by_key(|e| e.agency_id);
        Self(entries)
    }

    pub fn entries(&self) -> &[AgencyFranchiseEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn franchise_count(&self) -> usize {
        self.0.iter().map(|e| e.franchise_numbers.len()).sum()
    }

    /// First entry, in ascending agency order, that lists `franchise_number`.
    pub fn find(&self, franchise_number: &str) -> Option<&AgencyFranchiseEntry> {
        self.0.iter().find(|e| e.contains(franchise_number))
    }

    /// Every (agency, franchise) pair in index order.
    pub fn mappings(&self) -> impl Iterator<Item = FranchiseMapping> + '_ {
        self.0.iter().flat_map(|entry| {
            entry
                .franchise_numbers
                .iter()
                .map(move |n| FranchiseMapping::new(entry.agency_id, n.as_str()))
        })
    }

    pub fn into_entries(self) -> Vec<AgencyFranchiseEntry> {
        self.0
    }
}

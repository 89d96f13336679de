//! Upstream record shapes.
//!
//! Only the fields the franchise transform reads are modelled; the upstream
//! records carry many more, which are ignored.

use serde::{Deserialize, Deserializer, Serialize};

/// An upstream agency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subdomain: String,
    /// URL of the agency's location collection, empty when it has none.
    #[serde(default, rename = "locations", deserialize_with = "null_as_empty")]
    pub locations_url: String,
}

impl AgencyRecord {
    pub fn new(id: i64, subdomain: impl Into<String>, locations_url: impl Into<String>) -> Self {
        Self { id, subdomain: subdomain.into(), locations_url: locations_url.into() }
    }

    pub fn has_locations(&self) -> bool {
        !self.locations_url.trim().is_empty()
    }
}

/// One location of an agency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

impl LocationRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

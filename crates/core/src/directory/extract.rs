//! Franchise number extraction.
//!
//! An agency's franchise numbers come from two places: the first run of
//! digits in its subdomain (`hisc1234` -> `1234`), and every location whose
//! name is purely digits. Numbers are compared as strings, so `0042` and `42`
//! are distinct.

use std::sync::LazyLock;

use regex::Regex;

use super::model::{AgencyRecord, LocationRecord};

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new("[0-9]+").expect("invalid digit pattern"));

/// Leftmost maximal run of ASCII digits in `subdomain`.
pub fn subdomain_franchise(subdomain: &str) -> Option<&str> {
    DIGIT_RUN.find(subdomain).map(|m| m.as_str())
}

/// Non-empty and ASCII digits only.
pub fn is_franchise_number(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// Franchise numbers for one agency, subdomain number first.
///
/// Location names equal to the subdomain number are skipped; repeats among
/// location names are kept.
pub fn extract_franchise_numbers(agency: &AgencyRecord, locations: &[LocationRecord]) -> Vec<String> {
    let from_subdomain = subdomain_franchise(&agency.subdomain);

    from_subdomain
        .into_iter()
        .chain(
            locations
                .iter()
                .map(|location| location.name.as_str())
                .filter(|name| Some(*name) != from_subdomain && is_franchise_number(name)),
        )
        .map(str::to_string)
        .collect()
}

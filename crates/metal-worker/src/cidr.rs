//! Canonical representation of the aggregated CIDR set.
//!
//! Storage (Infrastructure status) and propagation (the routing container's
//! environment) both carry the set as one string. Sorting comes from the
//! BTreeSet iteration order; the exact order is irrelevant to routing but
//! must be stable so unchanged aggregates compare equal and skip patches.

use std::collections::BTreeSet;

/// Join a CIDR set into its canonical comma-separated form.
///
/// An empty set yields an empty string.
pub fn join_cidrs(cidrs: &BTreeSet<String>) -> String {
    cidrs.iter().cloned().collect::<Vec<_>>().join(",")
}

/// Parse a joined CIDR string back into a set.
///
/// Lossless inverse of [`join_cidrs`] for any non-empty input it produced.
pub fn parse_cidrs(joined: &str) -> BTreeSet<String> {
    if joined.is_empty() {
        return BTreeSet::new();
    }
    joined.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn join_sorts_lexicographically() {
        let cidrs = set(&["10.0.2.0/24", "10.0.1.0/24"]);
        assert_eq!(join_cidrs(&cidrs), "10.0.1.0/24,10.0.2.0/24");
    }

    #[test]
    fn empty_set_joins_to_empty_string() {
        assert_eq!(join_cidrs(&BTreeSet::new()), "");
    }

    #[test]
    fn parse_deduplicates() {
        let parsed = parse_cidrs("10.0.1.0/24,10.0.1.0/24,10.0.2.0/24");
        assert_eq!(parsed, set(&["10.0.1.0/24", "10.0.2.0/24"]));
    }

    #[test]
    fn parse_of_empty_is_empty() {
        assert!(parse_cidrs("").is_empty());
    }

    #[test]
    fn round_trip_is_lossless() {
        for cidrs in [
            set(&["10.0.0.0/23"]),
            set(&["10.0.2.0/24", "10.0.1.0/24", "192.168.0.0/16"]),
            set(&["10.80.0.0/25", "10.80.0.128/25"]),
        ] {
            assert_eq!(parse_cidrs(&join_cidrs(&cidrs)), cidrs);
        }
    }
}

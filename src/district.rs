//! District name canonicalization.
//!
//! The three feeds spell district names inconsistently ("Ahmed Nagar",
//! "Bid", "Mumbai( Sub Urban )"). Every record is folded onto one canonical
//! label before aggregation: trim, title-case, then a fixed remap table for
//! the known variants. The mapping is total and idempotent, so it can be
//! applied at any boundary without double-correcting.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Known spelling/formatting variants, keyed by their title-cased form.
static DISTRICT_REMAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Mumbai( Sub Urban )", "Mumbai Suburban"),
        ("Ahmed Nagar", "Ahmadnagar"),
        ("Bid", "Beed"),
        ("Buldhana", "Buldana"),
    ])
});

/// Title-cases a label: the first alphabetic character of every alphabetic
/// run is uppercased, the rest lowercased. Non-alphabetic characters pass
/// through and reset the run, so "mumbai( sub urban )" becomes
/// "Mumbai( Sub Urban )".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_run_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_run_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_run_start = false;
        } else {
            out.push(c);
            at_run_start = true;
        }
    }
    out
}

/// Canonical form of a raw district label. Total: every input maps to
/// exactly one output, unknown names simply normalize to title case.
pub fn canonicalize(raw: &str) -> String {
    let titled = title_case(raw.trim());
    match DISTRICT_REMAP.get(titled.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => titled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_handles_alpha_runs() {
        assert_eq!(title_case("ahmed nagar"), "Ahmed Nagar");
        assert_eq!(title_case("mumbai( sub urban )"), "Mumbai( Sub Urban )");
        assert_eq!(title_case("PUNE"), "Pune");
        assert_eq!(title_case("nashik-rural"), "Nashik-Rural");
    }

    #[test]
    fn known_variants_are_remapped() {
        assert_eq!(canonicalize("Ahmed Nagar"), "Ahmadnagar");
        assert_eq!(canonicalize("ahmed nagar"), "Ahmadnagar");
        assert_eq!(canonicalize("  Bid  "), "Beed");
        assert_eq!(canonicalize("BULDHANA"), "Buldana");
        assert_eq!(canonicalize("Mumbai( Sub Urban )"), "Mumbai Suburban");
    }

    #[test]
    fn unknown_names_title_case_only() {
        assert_eq!(canonicalize("  pune "), "Pune");
        assert_eq!(canonicalize("Thane"), "Thane");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for raw in [
            "Ahmed Nagar",
            "mumbai( sub urban )",
            "bid",
            "Buldhana",
            "Pune",
            "  nashik  ",
            "",
            "123",
        ] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn empty_and_non_alpha_inputs_are_total() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   "), "");
        assert_eq!(canonicalize("42"), "42");
    }
}

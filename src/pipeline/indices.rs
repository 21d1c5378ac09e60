//! Index derivation over the merged table.
//!
//! Totals are summed per source, the activity floor is applied exactly once
//! before any ratio, and every derived value passes a final sanitation step
//! that maps non-finite results to zero. This stage is pure and total: it
//! never fails on a well-formed merged table, and an empty merge yields an
//! empty table carrying the same column schema.

use crate::constants::{BIOMETRIC_WEIGHT, DEMOGRAPHIC_WEIGHT, ENROLLMENT_WEIGHT};
use crate::pipeline::reconciler::MergedRow;
use crate::types::{AggregatedRow, SourceKind};
use std::collections::BTreeMap;

/// Derives totals and composite indices for every merged row.
pub fn derive_indices(merged: Vec<MergedRow>) -> Vec<AggregatedRow> {
    merged.into_iter().map(derive_row).collect()
}

fn derive_row(row: MergedRow) -> AggregatedRow {
    let total_enrollment = prefix_total(&row.enrollment, SourceKind::Enrollment.counter_prefix());
    let total_biometric = prefix_total(&row.biometric, SourceKind::Biometric.counter_prefix());
    let total_demographic = prefix_total(&row.demographic, SourceKind::Demographic.counter_prefix());

    // Activity floor: the one divisor guard, applied once before every ratio
    let raw_activity = total_enrollment + total_biometric + total_demographic;
    let total_activity = if raw_activity == 0.0 { 1.0 } else { raw_activity };

    // Identity Volatility Index: share of activity that is maintenance
    // (updates) rather than growth (new enrollment). Range 0-100.
    let ivi = (total_demographic + total_biometric) / total_activity * 100.0;

    // Biometric Stress Ratio: share of biometric updates in total operations.
    // High values flag aging-population re-enrollment or auth-failure churn.
    let bsr = total_biometric / total_activity * 100.0;

    // Aadhaar Pressure Index: composite operational load in work units,
    // weighted by relative processing effort per operation type.
    let api = total_enrollment * ENROLLMENT_WEIGHT
        + total_biometric * BIOMETRIC_WEIGHT
        + total_demographic * DEMOGRAPHIC_WEIGHT;

    // Migration proxy: demographic updates usually mean address or detail
    // changes. Range 0-10.
    let migration_intensity = total_demographic / total_activity * 10.0;

    let api = sanitize(api);

    AggregatedRow {
        date: row.date,
        district: row.district,
        enrollment: row.enrollment,
        biometric: row.biometric,
        demographic: row.demographic,
        total_enrollment: sanitize(total_enrollment),
        total_biometric: sanitize(total_biometric),
        total_demographic: sanitize(total_demographic),
        total_activity: sanitize(total_activity),
        ivi: sanitize(ivi),
        bsr: sanitize(bsr),
        api,
        stress_index: api,
        migration_intensity: sanitize(migration_intensity),
    }
}

fn prefix_total(counters: &BTreeMap<String, f64>, prefix: &str) -> f64 {
    counters
        .iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .map(|(_, value)| value)
        .sum()
}

/// Final sanitation pass: degenerate arithmetic must never leak NaN or
/// Infinity into the table.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn counters(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|(n, v)| (n.to_string(), *v))
            .collect()
    }

    fn merged_row(
        enrollment: &[(&str, f64)],
        biometric: &[(&str, f64)],
        demographic: &[(&str, f64)],
    ) -> MergedRow {
        MergedRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            district: "Ahmadnagar".to_string(),
            enrollment: counters(enrollment),
            biometric: counters(biometric),
            demographic: counters(demographic),
        }
    }

    #[test]
    fn derives_the_reference_scenario() {
        let rows = derive_indices(vec![merged_row(
            &[("age_0_5", 10.0), ("age_5_17", 20.0), ("age_18_greater", 70.0)],
            &[("bio_age_5_17", 15.0)],
            &[("demo_age_5_17", 5.0)],
        )]);
        let row = &rows[0];

        assert_eq!(row.total_enrollment, 100.0);
        assert_eq!(row.total_biometric, 15.0);
        assert_eq!(row.total_demographic, 5.0);
        assert_eq!(row.total_activity, 120.0);
        assert_eq!(row.api, 100.0 * 1.0 + 15.0 * 0.5 + 5.0 * 0.2);
        assert_eq!(row.api, 108.5);
        assert_eq!(row.stress_index, row.api);
        assert!((row.migration_intensity - 5.0 / 120.0 * 10.0).abs() < 1e-12);
        assert!((row.bsr - 12.5).abs() < 1e-12);
        assert!((row.ivi - 20.0 / 120.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn zero_activity_row_is_floored_not_divided_by_zero() {
        let rows = derive_indices(vec![merged_row(
            &[("age_0_5", 0.0)],
            &[("bio_age_5_17", 0.0)],
            &[("demo_age_5_17", 0.0)],
        )]);
        let row = &rows[0];

        assert_eq!(row.total_activity, 1.0);
        assert_eq!(row.ivi, 0.0);
        assert_eq!(row.bsr, 0.0);
        assert_eq!(row.api, 0.0);
        assert_eq!(row.migration_intensity, 0.0);
    }

    #[test]
    fn index_ranges_hold_across_skewed_rows() {
        let cases = vec![
            merged_row(&[("age_0_5", 1000.0)], &[], &[]),
            merged_row(&[], &[("bio_age_5_17", 500.0)], &[]),
            merged_row(&[], &[], &[("demo_age_5_17", 42.0)]),
            merged_row(
                &[("age_0_5", 3.0)],
                &[("bio_age_5_17", 7.0)],
                &[("demo_age_5_17", 11.0)],
            ),
        ];

        for row in derive_indices(cases) {
            assert!((0.0..=100.0).contains(&row.ivi), "ivi out of range");
            assert!((0.0..=100.0).contains(&row.bsr), "bsr out of range");
            assert!(
                (0.0..=10.0).contains(&row.migration_intensity),
                "migration out of range"
            );
            assert!(row.api >= 0.0);
            assert!(row.total_activity >= 1.0);
            assert_eq!(row.stress_index, row.api);
            for value in [row.ivi, row.bsr, row.api, row.migration_intensity] {
                assert!(value.is_finite());
            }
        }
    }

    #[test]
    fn upstream_non_finite_values_are_sanitized() {
        let rows = derive_indices(vec![merged_row(
            &[("age_0_5", f64::INFINITY)],
            &[("bio_age_5_17", f64::NAN)],
            &[],
        )]);
        let row = &rows[0];

        for value in [
            row.total_enrollment,
            row.total_biometric,
            row.total_activity,
            row.ivi,
            row.bsr,
            row.api,
            row.stress_index,
            row.migration_intensity,
        ] {
            assert!(value.is_finite(), "non-finite value leaked");
        }
    }

    #[test]
    fn only_prefixed_columns_feed_the_totals() {
        let rows = derive_indices(vec![merged_row(
            &[("age_0_5", 10.0), ("remarks_code", 99.0)],
            &[("bio_age_5_17", 5.0), ("age_5_17_bio", 33.0)],
            &[("demo_age_5_17", 2.0)],
        )]);
        let row = &rows[0];

        assert_eq!(row.total_enrollment, 10.0);
        assert_eq!(row.total_biometric, 5.0);
        assert_eq!(row.total_demographic, 2.0);
    }

    #[test]
    fn empty_merge_yields_empty_table() {
        assert!(derive_indices(Vec::new()).is_empty());
    }
}

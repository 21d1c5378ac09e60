//! The reconciled, indexed table and its read-only query surface.
//!
//! A snapshot is built once per pipeline run and never mutated; any number
//! of queries may run against it concurrently. A refresh builds a whole new
//! snapshot and swaps the shared reference, so readers never observe a
//! partially-rebuilt table.

use crate::constants::{
    CRITICAL_STRESS_THRESHOLD, FORECAST_GROWTH_RATE, HIGH_MIGRATION_THRESHOLD, KIT_DAILY_CAPACITY,
};
use crate::types::{AggregatedRow, LoadReport, SourceKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct AnalysisSnapshot {
    rows: Vec<AggregatedRow>,
    load: LoadReport,
    built_at: DateTime<Utc>,
}

/// Aggregated stats over an optional district filter. Zero-filled when the
/// filter matches nothing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DistrictStats {
    pub total_enrollment: i64,
    pub total_biometric: i64,
    pub total_demographic: i64,
    pub avg_stress_index: f64,
    pub avg_migration_score: f64,
}

impl DistrictStats {
    fn zero() -> Self {
        Self {
            total_enrollment: 0,
            total_biometric: 0,
            total_demographic: 0,
            avg_stress_index: 0.0,
            avg_migration_score: 0.0,
        }
    }
}

/// Per-district hotspot score across the full observed period.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapEntry {
    pub district: String,
    pub stress_index: f64,
    pub migration_intensity: f64,
}

/// Age-bracket totals for a deep dive, keyed the way consumers expect.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgeDemographics {
    #[serde(rename = "0-5")]
    pub age_0_5: i64,
    #[serde(rename = "5-17")]
    pub age_5_17: i64,
    #[serde(rename = "18+")]
    pub age_18_greater: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeepDive {
    pub age_demographics: AgeDemographics,
    pub kits_recommended: i64,
    pub status: String,
    pub migration_flag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub month: String,
    pub predicted_stress: f64,
    pub required_kits: i64,
}

/// Per-date means for charting.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_enrollment: f64,
    pub stress_index: f64,
    pub migration_intensity: f64,
}

impl AnalysisSnapshot {
    pub fn new(rows: Vec<AggregatedRow>, load: LoadReport) -> Self {
        Self {
            rows,
            load,
            built_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), LoadReport::default())
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load
    }

    pub fn degraded_sources(&self) -> Vec<SourceKind> {
        self.load.degraded_sources()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Rows matching an optional case-insensitive district filter.
    fn filtered(&self, district: Option<&str>) -> Vec<&AggregatedRow> {
        match district {
            Some(name) => {
                let needle = name.to_lowercase();
                self.rows
                    .iter()
                    .filter(|r| r.district.to_lowercase() == needle)
                    .collect()
            }
            None => self.rows.iter().collect(),
        }
    }

    /// Distinct canonical district names, ascending.
    pub fn districts(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.district.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Summed totals and mean indices over the filter. An empty selection
    /// yields an explicit all-zero result, never an error.
    pub fn district_stats(&self, district: Option<&str>) -> DistrictStats {
        let rows = self.filtered(district);
        if rows.is_empty() {
            return DistrictStats::zero();
        }

        let count = rows.len() as f64;
        DistrictStats {
            total_enrollment: rows.iter().map(|r| r.total_enrollment).sum::<f64>() as i64,
            total_biometric: rows.iter().map(|r| r.total_biometric).sum::<f64>() as i64,
            total_demographic: rows.iter().map(|r| r.total_demographic).sum::<f64>() as i64,
            avg_stress_index: rows.iter().map(|r| r.stress_index).sum::<f64>() / count,
            avg_migration_score: rows.iter().map(|r| r.migration_intensity).sum::<f64>() / count,
        }
    }

    /// Mean stress and migration intensity per district over the whole
    /// observed period: a stable hotspot view, not time-sliced.
    pub fn stress_heatmap(&self) -> Vec<HeatmapEntry> {
        self.per_district_means()
            .into_iter()
            .map(|(district, stress, migration)| HeatmapEntry {
                district,
                stress_index: stress,
                migration_intensity: migration,
            })
            .collect()
    }

    /// (district, mean stress, mean migration) for every district, ascending
    /// by name.
    pub(crate) fn per_district_means(&self) -> Vec<(String, f64, f64)> {
        let mut acc: BTreeMap<&str, (f64, f64, usize)> = BTreeMap::new();
        for row in &self.rows {
            let entry = acc.entry(row.district.as_str()).or_insert((0.0, 0.0, 0));
            entry.0 += row.stress_index;
            entry.1 += row.migration_intensity;
            entry.2 += 1;
        }
        acc.into_iter()
            .map(|(district, (stress, migration, n))| {
                let n = n as f64;
                (district.to_string(), stress / n, migration / n)
            })
            .collect()
    }

    /// Detailed breakdown for one district: age totals, a kit estimate and
    /// status/migration flags. An unmatched district gets an explicit
    /// placeholder result.
    pub fn deep_dive(&self, district: &str) -> DeepDive {
        let rows = self.filtered(Some(district));
        if rows.is_empty() {
            return DeepDive {
                age_demographics: AgeDemographics {
                    age_0_5: 0,
                    age_5_17: 0,
                    age_18_greater: 0,
                },
                kits_recommended: 0,
                status: "No Data".to_string(),
                migration_flag: "Unknown".to_string(),
            };
        }

        let count = rows.len() as f64;
        let avg_daily_ops = rows.iter().map(|r| r.stress_index).sum::<f64>() / count;
        let avg_migration = rows.iter().map(|r| r.migration_intensity).sum::<f64>() / count;

        DeepDive {
            age_demographics: AgeDemographics {
                age_0_5: rows.iter().map(|r| r.age_0_5()).sum::<f64>() as i64,
                age_5_17: rows.iter().map(|r| r.age_5_17()).sum::<f64>() as i64,
                age_18_greater: rows.iter().map(|r| r.age_18_greater()).sum::<f64>() as i64,
            },
            kits_recommended: (avg_daily_ops / KIT_DAILY_CAPACITY).ceil() as i64,
            status: if avg_daily_ops > CRITICAL_STRESS_THRESHOLD {
                "Critical".to_string()
            } else {
                "Normal".to_string()
            },
            migration_flag: if avg_migration > HIGH_MIGRATION_THRESHOLD {
                "High In-Migration".to_string()
            } else {
                "Stable".to_string()
            },
        }
    }

    /// Naive projection: the district's mean stress index compounded by a
    /// fixed growth rate per future period. Fewer than two historical rows
    /// is an insufficient basis and yields an empty forecast.
    pub fn forecast(&self, district: &str, periods: usize) -> Vec<ForecastPoint> {
        let rows = self.filtered(Some(district));
        if rows.len() < 2 {
            return Vec::new();
        }

        // Mean over the history rather than the last value, for stability
        let baseline = rows.iter().map(|r| r.stress_index).sum::<f64>() / rows.len() as f64;

        (1..=periods)
            .map(|period| {
                let predicted = baseline * FORECAST_GROWTH_RATE.powi(period as i32);
                ForecastPoint {
                    month: format!("M+{}", period),
                    predicted_stress: predicted,
                    required_kits: (predicted / KIT_DAILY_CAPACITY).ceil() as i64,
                }
            })
            .collect()
    }

    /// Per-date means of enrollment, stress and migration over the filter,
    /// date-ascending.
    pub fn trends(&self, district: Option<&str>) -> Vec<TrendPoint> {
        let mut acc: BTreeMap<NaiveDate, (f64, f64, f64, usize)> = BTreeMap::new();
        for row in self.filtered(district) {
            let entry = acc.entry(row.date).or_insert((0.0, 0.0, 0.0, 0));
            entry.0 += row.total_enrollment;
            entry.1 += row.stress_index;
            entry.2 += row.migration_intensity;
            entry.3 += 1;
        }
        acc.into_iter()
            .map(|(date, (enrollment, stress, migration, n))| {
                let n = n as f64;
                TrendPoint {
                    date,
                    total_enrollment: enrollment / n,
                    stress_index: stress / n,
                    migration_intensity: migration / n,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::indices::derive_indices;
    use crate::pipeline::reconciler::MergedRow;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn counters(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|(n, v)| (n.to_string(), *v))
            .collect()
    }

    fn row(day: u32, district: &str, enroll: f64, bio: f64, demo: f64) -> MergedRow {
        MergedRow {
            date: date(day),
            district: district.to_string(),
            enrollment: counters(&[
                ("age_0_5", enroll * 0.1),
                ("age_5_17", enroll * 0.2),
                ("age_18_greater", enroll * 0.7),
            ]),
            biometric: counters(&[("bio_age_5_17", bio)]),
            demographic: counters(&[("demo_age_5_17", demo)]),
        }
    }

    fn snapshot(rows: Vec<MergedRow>) -> AnalysisSnapshot {
        AnalysisSnapshot::new(derive_indices(rows), LoadReport::default())
    }

    #[test]
    fn districts_are_distinct_and_sorted() {
        let snap = snapshot(vec![
            row(10, "Thane", 10.0, 0.0, 0.0),
            row(11, "Thane", 10.0, 0.0, 0.0),
            row(10, "Ahmadnagar", 10.0, 0.0, 0.0),
        ]);
        assert_eq!(snap.districts(), vec!["Ahmadnagar", "Thane"]);
    }

    #[test]
    fn stats_filter_is_case_insensitive() {
        let snap = snapshot(vec![
            row(10, "Pune", 100.0, 10.0, 10.0),
            row(11, "Thane", 50.0, 5.0, 5.0),
        ]);
        let stats = snap.district_stats(Some("pune"));
        assert_eq!(stats.total_enrollment, 100);
        assert_eq!(stats.total_biometric, 10);
        assert_eq!(stats.total_demographic, 10);
    }

    #[test]
    fn stats_on_unmatched_filter_are_all_zero() {
        let snap = snapshot(vec![row(10, "Pune", 100.0, 10.0, 10.0)]);
        assert_eq!(snap.district_stats(Some("Nagpur")), DistrictStats::zero());
        assert_eq!(
            AnalysisSnapshot::empty().district_stats(None),
            DistrictStats::zero()
        );
    }

    #[test]
    fn heatmap_averages_across_the_period() {
        let snap = snapshot(vec![
            row(10, "Pune", 100.0, 0.0, 0.0),
            row(11, "Pune", 200.0, 0.0, 0.0),
        ]);
        let heatmap = snap.stress_heatmap();
        assert_eq!(heatmap.len(), 1);
        assert_eq!(heatmap[0].district, "Pune");
        assert!((heatmap[0].stress_index - 150.0).abs() < 1e-9);
    }

    #[test]
    fn deep_dive_reports_critical_at_mean_stress_250() {
        // One row with pure enrollment of 250 gives stress exactly 250
        let snap = snapshot(vec![
            row(10, "Pune", 250.0, 0.0, 0.0),
            row(11, "Pune", 250.0, 0.0, 0.0),
        ]);
        let dive = snap.deep_dive("Pune");
        assert_eq!(dive.status, "Critical");
        assert_eq!(dive.kits_recommended, 5);
        assert_eq!(dive.migration_flag, "Stable");
        assert_eq!(
            dive.age_demographics,
            AgeDemographics {
                age_0_5: 50,
                age_5_17: 100,
                age_18_greater: 350,
            }
        );
    }

    #[test]
    fn deep_dive_on_unknown_district_is_a_placeholder() {
        let snap = snapshot(vec![row(10, "Pune", 10.0, 0.0, 0.0)]);
        let dive = snap.deep_dive("Atlantis");
        assert_eq!(dive.status, "No Data");
        assert_eq!(dive.migration_flag, "Unknown");
        assert_eq!(dive.kits_recommended, 0);
    }

    #[test]
    fn forecast_needs_at_least_two_rows() {
        let snap = snapshot(vec![row(10, "Pune", 100.0, 0.0, 0.0)]);
        assert!(snap.forecast("Pune", 3).is_empty());
    }

    #[test]
    fn forecast_compounds_growth_per_period() {
        let snap = snapshot(vec![
            row(10, "Pune", 100.0, 0.0, 0.0),
            row(11, "Pune", 100.0, 0.0, 0.0),
        ]);
        let forecast = snap.forecast("Pune", 3);
        assert_eq!(forecast.len(), 3);
        assert_eq!(forecast[0].month, "M+1");
        assert!((forecast[0].predicted_stress - 105.0).abs() < 1e-9);
        assert!((forecast[1].predicted_stress - 110.25).abs() < 1e-9);
        assert_eq!(forecast[0].required_kits, 3);
    }

    #[test]
    fn trends_average_per_date_in_order() {
        let snap = snapshot(vec![
            row(11, "Pune", 200.0, 0.0, 0.0),
            row(10, "Pune", 100.0, 0.0, 0.0),
            row(10, "Thane", 300.0, 0.0, 0.0),
        ]);
        let trends = snap.trends(None);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].date, date(10));
        assert!((trends[0].total_enrollment - 200.0).abs() < 1e-9);
        assert_eq!(trends[1].date, date(11));

        let pune_only = snap.trends(Some("pune"));
        assert!((pune_only[0].total_enrollment - 100.0).abs() < 1e-9);
    }
}

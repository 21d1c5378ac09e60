//! Planning analytics derived from the snapshot: resource recommendations,
//! migration alerts, cost analysis, efficiency metrics and the district
//! summary export. Everything here is a pure rollup of the aggregated
//! table; empty or degraded snapshots produce zero-filled results.

use crate::constants::{
    COST_PER_BIOMETRIC, COST_PER_DEMOGRAPHIC, COST_PER_ENROLLMENT, COST_PER_KIT,
    COST_PER_STAFF_ANNUAL, CRITICAL_STRESS_THRESHOLD, ELEVATED_STRESS_THRESHOLD,
    HIGH_MIGRATION_THRESHOLD, INR_CRORE, KIT_DAILY_CAPACITY, MIGRATION_HIGH, MIGRATION_LOW,
    MIGRATION_NORMAL, MIGRATION_VERY_HIGH, OPTIMIZATION_SAVINGS_RATE, STAFF_OPS_CAPACITY,
};
use crate::snapshot::AnalysisSnapshot;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Per-district rollup shared by the analytics below.
#[derive(Debug, Clone)]
struct DistrictRollup {
    district: String,
    avg_stress: f64,
    avg_migration: f64,
    total_enrollment: f64,
    total_biometric: f64,
    total_demographic: f64,
}

impl DistrictRollup {
    fn total_ops(&self) -> f64 {
        self.total_enrollment + self.total_biometric + self.total_demographic
    }
}

fn district_rollups(snapshot: &AnalysisSnapshot) -> Vec<DistrictRollup> {
    let mut acc: BTreeMap<&str, (f64, f64, f64, f64, f64, usize)> = BTreeMap::new();
    for row in snapshot.rows() {
        let entry = acc
            .entry(row.district.as_str())
            .or_insert((0.0, 0.0, 0.0, 0.0, 0.0, 0));
        entry.0 += row.stress_index;
        entry.1 += row.migration_intensity;
        entry.2 += row.total_enrollment;
        entry.3 += row.total_biometric;
        entry.4 += row.total_demographic;
        entry.5 += 1;
    }
    acc.into_iter()
        .map(|(district, (stress, migration, e, b, d, n))| {
            let n = n as f64;
            DistrictRollup {
                district: district.to_string(),
                avg_stress: round2(stress / n),
                avg_migration: round2(migration / n),
                total_enrollment: e,
                total_biometric: b,
                total_demographic: d,
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn sort_desc_by<T, F: Fn(&T) -> f64>(items: &mut [T], key: F) {
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Rupee amount with thousands grouping, e.g. `₹1,234,567`.
fn format_inr(value: f64) -> String {
    let n = value.round() as i64;
    let digits = n.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

fn priority_for(stress: f64) -> &'static str {
    if stress > CRITICAL_STRESS_THRESHOLD {
        "High"
    } else if stress > ELEVATED_STRESS_THRESHOLD {
        "Medium"
    } else {
        "Low"
    }
}

fn migration_level_for(score: f64) -> &'static str {
    if score > MIGRATION_VERY_HIGH {
        "Very High"
    } else if score > MIGRATION_HIGH {
        "High"
    } else if score > MIGRATION_NORMAL {
        "Normal"
    } else if score > MIGRATION_LOW {
        "Low"
    } else {
        "Very Low"
    }
}

fn recommended_kits(avg_stress: f64) -> i64 {
    (avg_stress / KIT_DAILY_CAPACITY).max(1.0) as i64
}

fn recommended_staff(total_ops: f64) -> i64 {
    (total_ops / STAFF_OPS_CAPACITY).max(1.0) as i64
}

#[derive(Debug, Clone, Serialize)]
pub struct DistrictRecommendation {
    pub district: String,
    pub avg_stress_index: f64,
    pub avg_migration_intensity: f64,
    pub total_enrollment: i64,
    pub total_biometric: i64,
    pub total_demographic: i64,
    pub recommended_kits: i64,
    pub recommended_staff: i64,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceRecommendations {
    /// Top districts by mean stress, highest first.
    pub recommendations: Vec<DistrictRecommendation>,
    pub total_kits_needed: i64,
    pub total_staff_needed: i64,
}

/// Resource allocation recommendations per district. The list is capped at
/// the top 20 hotspots; the fleet-wide totals cover every district.
pub fn resource_recommendations(snapshot: &AnalysisSnapshot) -> ResourceRecommendations {
    let rollups = district_rollups(snapshot);

    let total_kits_needed: i64 = rollups.iter().map(|r| recommended_kits(r.avg_stress)).sum();
    let total_staff_needed: i64 = rollups
        .iter()
        .map(|r| recommended_staff(r.total_ops()))
        .sum();

    let mut recommendations: Vec<DistrictRecommendation> = rollups
        .into_iter()
        .map(|r| DistrictRecommendation {
            recommended_kits: recommended_kits(r.avg_stress),
            recommended_staff: recommended_staff(r.total_ops()),
            priority: priority_for(r.avg_stress).to_string(),
            avg_stress_index: r.avg_stress,
            avg_migration_intensity: r.avg_migration,
            total_enrollment: r.total_enrollment as i64,
            total_biometric: r.total_biometric as i64,
            total_demographic: r.total_demographic as i64,
            district: r.district,
        })
        .collect();
    sort_desc_by(&mut recommendations, |r| r.avg_stress_index);
    recommendations.truncate(20);

    ResourceRecommendations {
        recommendations,
        total_kits_needed,
        total_staff_needed,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationAlert {
    pub district: String,
    pub migration_score: f64,
    pub total_updates: i64,
    pub alert_level: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertBreakdown {
    pub very_high: i64,
    pub high: i64,
    pub normal: i64,
    pub low: i64,
    pub very_low: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationAlerts {
    /// Top 20 districts by migration score, for display.
    pub alerts: Vec<MigrationAlert>,
    pub total_high_migration_districts: i64,
    pub alert_breakdown: AlertBreakdown,
    /// Full classified list.
    pub all_alerts: Vec<MigrationAlert>,
}

/// High-migration district alerts with level classification.
pub fn migration_alerts(snapshot: &AnalysisSnapshot) -> MigrationAlerts {
    let rollups = district_rollups(snapshot);

    let mut all_alerts: Vec<MigrationAlert> = rollups
        .into_iter()
        .map(|r| MigrationAlert {
            migration_score: r.avg_migration,
            total_updates: r.total_demographic as i64,
            alert_level: migration_level_for(r.avg_migration).to_string(),
            district: r.district,
        })
        .collect();
    sort_desc_by(&mut all_alerts, |a| a.migration_score);

    let count_where = |pred: &dyn Fn(f64) -> bool| -> i64 {
        all_alerts.iter().filter(|a| pred(a.migration_score)).count() as i64
    };
    let breakdown = AlertBreakdown {
        very_high: count_where(&|s| s > MIGRATION_VERY_HIGH),
        high: count_where(&|s| s > MIGRATION_HIGH && s <= MIGRATION_VERY_HIGH),
        normal: count_where(&|s| s > MIGRATION_NORMAL && s <= MIGRATION_HIGH),
        low: count_where(&|s| s > MIGRATION_LOW && s <= MIGRATION_NORMAL),
        very_low: count_where(&|s| s <= MIGRATION_LOW),
    };

    MigrationAlerts {
        alerts: all_alerts.iter().take(20).cloned().collect(),
        total_high_migration_districts: breakdown.very_high + breakdown.high,
        alert_breakdown: breakdown,
        all_alerts,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CostAnalysis {
    pub operational_cost_inr: i64,
    pub operational_cost_crore: f64,
    pub operational_cost_formatted: String,

    pub kit_investment_inr: i64,
    pub kit_investment_crore: f64,
    pub kit_investment_formatted: String,

    pub staff_cost_annual_inr: i64,
    pub staff_cost_crore: f64,
    pub staff_cost_formatted: String,

    pub total_infrastructure_inr: i64,
    pub total_infrastructure_crore: f64,
    pub total_infrastructure_formatted: String,

    pub potential_savings_inr: i64,
    pub potential_savings_crore: f64,
    pub potential_savings_formatted: String,

    pub roi_percentage: f64,

    pub total_kits_needed: i64,
    pub total_staff_needed: i64,

    pub total_enrollments: i64,
    pub total_biometric_updates: i64,
    pub total_demographic_updates: i64,
}

/// Cost analysis over the whole table, using the fixed INR assumptions.
pub fn cost_analysis(snapshot: &AnalysisSnapshot) -> CostAnalysis {
    let rows = snapshot.rows();
    let total_enrollments: f64 = rows.iter().map(|r| r.total_enrollment).sum();
    let total_biometric: f64 = rows.iter().map(|r| r.total_biometric).sum();
    let total_demographic: f64 = rows.iter().map(|r| r.total_demographic).sum();

    let operational_cost = total_enrollments * COST_PER_ENROLLMENT
        + total_biometric * COST_PER_BIOMETRIC
        + total_demographic * COST_PER_DEMOGRAPHIC;

    // Kits are fractional per district here, floored at one, then summed;
    // the recommendation view truncates per district instead.
    let total_kits: f64 = snapshot
        .per_district_means()
        .iter()
        .map(|(_, stress, _)| (stress / KIT_DAILY_CAPACITY).max(1.0))
        .sum();
    let total_kits = total_kits as i64;
    let total_staff = ((total_enrollments + total_biometric + total_demographic)
        / STAFF_OPS_CAPACITY) as i64;

    let kit_cost = total_kits as f64 * COST_PER_KIT;
    let staff_cost = total_staff as f64 * COST_PER_STAFF_ANNUAL;
    let total_infrastructure = kit_cost + staff_cost;

    let potential_savings = operational_cost * OPTIMIZATION_SAVINGS_RATE;
    let roi_percentage = if total_infrastructure > 0.0 {
        round1(potential_savings / total_infrastructure * 100.0)
    } else {
        0.0
    };

    CostAnalysis {
        operational_cost_inr: operational_cost as i64,
        operational_cost_crore: round2(operational_cost / INR_CRORE),
        operational_cost_formatted: format_inr(operational_cost),

        kit_investment_inr: kit_cost as i64,
        kit_investment_crore: round2(kit_cost / INR_CRORE),
        kit_investment_formatted: format_inr(kit_cost),

        staff_cost_annual_inr: staff_cost as i64,
        staff_cost_crore: round2(staff_cost / INR_CRORE),
        staff_cost_formatted: format_inr(staff_cost),

        total_infrastructure_inr: total_infrastructure as i64,
        total_infrastructure_crore: round2(total_infrastructure / INR_CRORE),
        total_infrastructure_formatted: format_inr(total_infrastructure),

        potential_savings_inr: potential_savings as i64,
        potential_savings_crore: round2(potential_savings / INR_CRORE),
        potential_savings_formatted: format_inr(potential_savings),

        roi_percentage,

        total_kits_needed: total_kits,
        total_staff_needed: total_staff,

        total_enrollments: total_enrollments as i64,
        total_biometric_updates: total_biometric as i64,
        total_demographic_updates: total_demographic as i64,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DistrictPerformance {
    pub district: String,
    pub total_enrollment: i64,
    pub total_biometric: i64,
    pub total_demographic: i64,
    pub avg_stress_index: f64,
    pub avg_migration_intensity: f64,
    pub total_ops: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyMetrics {
    pub total_operations: i64,
    pub total_districts: i64,
    pub avg_operations_per_district: i64,
    pub avg_stress_index: f64,
    pub avg_migration_score: f64,
    pub high_stress_districts: i64,
    pub high_migration_districts: i64,
    /// Top 10 districts by total operations.
    pub district_breakdown: Vec<DistrictPerformance>,
}

/// Fleet-wide efficiency view. Safe on an empty table.
pub fn efficiency_metrics(snapshot: &AnalysisSnapshot) -> EfficiencyMetrics {
    let rows = snapshot.rows();
    let rollups = district_rollups(snapshot);

    let total_operations: f64 = rollups.iter().map(|r| r.total_ops()).sum();
    let total_districts = rollups.len() as i64;
    let avg_operations_per_district = if total_districts > 0 {
        (total_operations / total_districts as f64) as i64
    } else {
        0
    };

    let row_count = rows.len() as f64;
    let (avg_stress, avg_migration) = if rows.is_empty() {
        (0.0, 0.0)
    } else {
        (
            round2(rows.iter().map(|r| r.stress_index).sum::<f64>() / row_count),
            round2(rows.iter().map(|r| r.migration_intensity).sum::<f64>() / row_count),
        )
    };

    let high_stress_districts = rollups
        .iter()
        .filter(|r| r.avg_stress > CRITICAL_STRESS_THRESHOLD)
        .count() as i64;
    let high_migration_districts = rollups
        .iter()
        .filter(|r| r.avg_migration > HIGH_MIGRATION_THRESHOLD)
        .count() as i64;

    let mut district_breakdown: Vec<DistrictPerformance> = rollups
        .into_iter()
        .map(|r| DistrictPerformance {
            total_ops: r.total_ops() as i64,
            total_enrollment: r.total_enrollment as i64,
            total_biometric: r.total_biometric as i64,
            total_demographic: r.total_demographic as i64,
            avg_stress_index: r.avg_stress,
            avg_migration_intensity: r.avg_migration,
            district: r.district,
        })
        .collect();
    sort_desc_by(&mut district_breakdown, |d| d.total_ops as f64);
    district_breakdown.truncate(10);

    EfficiencyMetrics {
        total_operations: total_operations as i64,
        total_districts,
        avg_operations_per_district,
        avg_stress_index: avg_stress,
        avg_migration_score: avg_migration,
        high_stress_districts,
        high_migration_districts,
        district_breakdown,
    }
}

/// District summary as CSV for the export endpoint and report command.
pub fn export_report_csv(snapshot: &AnalysisSnapshot) -> String {
    let mut rollups = district_rollups(snapshot);
    sort_desc_by(&mut rollups, |r| r.avg_stress);

    let mut writer = csv::Writer::from_writer(Vec::new());
    // Header mirrors the columns consumers already parse
    let _ = writer.write_record([
        "district",
        "total_enrollment",
        "total_biometric",
        "total_demographic",
        "avg_stress_index",
        "avg_migration_intensity",
        "total_operations",
        "recommended_kits",
        "recommended_staff",
        "priority",
        "migration_level",
    ]);
    for r in &rollups {
        let _ = writer.write_record([
            r.district.clone(),
            format!("{}", r.total_enrollment as i64),
            format!("{}", r.total_biometric as i64),
            format!("{}", r.total_demographic as i64),
            format!("{}", r.avg_stress),
            format!("{}", r.avg_migration),
            format!("{}", r.total_ops() as i64),
            format!("{}", recommended_kits(r.avg_stress)),
            format!("{}", recommended_staff(r.total_ops())),
            priority_for(r.avg_stress).to_string(),
            migration_level_for(r.avg_migration).to_string(),
        ]);
    }
    String::from_utf8(writer.into_inner().unwrap_or_default()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::indices::derive_indices;
    use crate::pipeline::reconciler::MergedRow;
    use crate::types::LoadReport;
    use chrono::NaiveDate;

    fn row(day: u32, district: &str, enroll: f64, bio: f64, demo: f64) -> MergedRow {
        MergedRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            district: district.to_string(),
            enrollment: [("age_18_greater".to_string(), enroll)].into(),
            biometric: [("bio_age_5_17".to_string(), bio)].into(),
            demographic: [("demo_age_5_17".to_string(), demo)].into(),
        }
    }

    fn snapshot(rows: Vec<MergedRow>) -> AnalysisSnapshot {
        AnalysisSnapshot::new(derive_indices(rows), LoadReport::default())
    }

    #[test]
    fn recommendations_rank_by_stress_and_floor_at_one_kit() {
        let snap = snapshot(vec![
            row(10, "Pune", 500.0, 0.0, 0.0),
            row(10, "Thane", 10.0, 0.0, 0.0),
        ]);
        let result = resource_recommendations(&snap);

        assert_eq!(result.recommendations[0].district, "Pune");
        assert_eq!(result.recommendations[0].recommended_kits, 10);
        assert_eq!(result.recommendations[0].priority, "High");
        assert_eq!(result.recommendations[1].district, "Thane");
        // 10 ops gives a fractional kit count, floored to the minimum of one
        assert_eq!(result.recommendations[1].recommended_kits, 1);
        assert_eq!(result.recommendations[1].priority, "Low");
        assert_eq!(result.total_kits_needed, 11);
        assert_eq!(result.total_staff_needed, 2);
    }

    #[test]
    fn migration_alert_levels_and_breakdown() {
        // demo-only activity pins migration intensity at 10
        let snap = snapshot(vec![
            row(10, "Pune", 0.0, 0.0, 80.0),
            row(10, "Thane", 100.0, 0.0, 0.0),
        ]);
        let result = migration_alerts(&snap);

        assert_eq!(result.all_alerts[0].district, "Pune");
        assert_eq!(result.all_alerts[0].alert_level, "Very High");
        assert_eq!(result.all_alerts[0].total_updates, 80);
        assert_eq!(result.all_alerts[1].alert_level, "Very Low");
        assert_eq!(result.alert_breakdown.very_high, 1);
        assert_eq!(result.alert_breakdown.very_low, 1);
        assert_eq!(result.total_high_migration_districts, 1);
    }

    #[test]
    fn cost_analysis_uses_fixed_inr_assumptions() {
        let snap = snapshot(vec![row(10, "Pune", 100.0, 10.0, 10.0)]);
        let result = cost_analysis(&snap);

        // 100*150 + 10*75 + 10*50
        assert_eq!(result.operational_cost_inr, 16_250);
        assert_eq!(result.potential_savings_inr, 1_625);
        assert_eq!(result.total_enrollments, 100);
        assert_eq!(result.total_kits_needed, 2);
        assert_eq!(result.total_staff_needed, 0);
        assert_eq!(result.operational_cost_formatted, "₹16,250");
    }

    #[test]
    fn efficiency_metrics_survive_an_empty_table() {
        let result = efficiency_metrics(&AnalysisSnapshot::empty());
        assert_eq!(result.total_operations, 0);
        assert_eq!(result.total_districts, 0);
        assert_eq!(result.avg_operations_per_district, 0);
        assert!(result.district_breakdown.is_empty());
    }

    #[test]
    fn export_csv_has_one_line_per_district_plus_header() {
        let snap = snapshot(vec![
            row(10, "Pune", 100.0, 0.0, 0.0),
            row(10, "Thane", 50.0, 0.0, 0.0),
        ]);
        let csv = export_report_csv(&snap);
        let lines: Vec<&str> = csv.trim_end().lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("district,"));
        assert!(lines[1].starts_with("Pune,"));
    }

    #[test]
    fn inr_formatting_groups_thousands() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(999.0), "₹999");
        assert_eq!(format_inr(1_234_567.0), "₹1,234,567");
        assert_eq!(format_inr(500_000.0), "₹500,000");
    }
}

//! One-shot master analysis report.
//!
//! Reproduces the narrative analysis outputs as files under an output
//! directory: enrollment breakdown, district hotspots, migration alerts,
//! cost analysis and the district summary CSV. Driven entirely by the query
//! surface; a degraded or empty snapshot produces zero-filled sections.

use crate::error::Result;
use crate::insights;
use crate::snapshot::AnalysisSnapshot;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes every report section and returns the paths produced.
pub fn write_master_report(snapshot: &AnalysisSnapshot, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let sections: [(&str, String); 5] = [
        ("01_enrollment_analysis.txt", enrollment_section(snapshot)),
        ("02_district_hotspots.csv", hotspots_csv(snapshot)),
        ("03_migration_alerts.txt", migration_section(snapshot)),
        (
            "04_cost_analysis.json",
            serde_json::to_string_pretty(&insights::cost_analysis(snapshot))?,
        ),
        (
            "05_district_summary.csv",
            insights::export_report_csv(snapshot),
        ),
    ];

    for (name, content) in sections {
        let path = output_dir.join(name);
        fs::write(&path, content)?;
        info!("Wrote report section {}", path.display());
        written.push(path);
    }

    Ok(written)
}

fn enrollment_section(snapshot: &AnalysisSnapshot) -> String {
    let rows = snapshot.rows();
    let total: f64 = rows.iter().map(|r| r.total_enrollment).sum();
    let by_age = [
        ("Age 0-5", rows.iter().map(|r| r.age_0_5()).sum::<f64>()),
        ("Age 5-17", rows.iter().map(|r| r.age_5_17()).sum::<f64>()),
        ("Age 18+", rows.iter().map(|r| r.age_18_greater()).sum::<f64>()),
    ];

    let mut out = String::new();
    let _ = writeln!(out, "ENROLLMENT ANALYSIS");
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "Total enrollments: {}", total as i64);
    for (label, count) in by_age {
        let pct = if total > 0.0 { count / total * 100.0 } else { 0.0 };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", label, count as i64, pct);
    }

    let _ = writeln!(out, "\nTop 10 enrollment districts:");
    let mut by_district: Vec<(String, f64)> = Vec::new();
    for district in snapshot.districts() {
        let sum: f64 = rows
            .iter()
            .filter(|r| r.district == district)
            .map(|r| r.total_enrollment)
            .sum();
        by_district.push((district, sum));
    }
    by_district.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (rank, (district, sum)) in by_district.iter().take(10).enumerate() {
        let _ = writeln!(out, "  {}. {}: {}", rank + 1, district, *sum as i64);
    }
    out
}

fn hotspots_csv(snapshot: &AnalysisSnapshot) -> String {
    let mut out = String::from("district,avg_stress_index,avg_migration_intensity\n");
    for entry in snapshot.stress_heatmap() {
        let _ = writeln!(
            out,
            "{},{},{}",
            entry.district, entry.stress_index, entry.migration_intensity
        );
    }
    out
}

fn migration_section(snapshot: &AnalysisSnapshot) -> String {
    let alerts = insights::migration_alerts(snapshot);

    let mut out = String::new();
    let _ = writeln!(out, "MIGRATION ALERTS");
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(
        out,
        "High-migration districts: {}",
        alerts.total_high_migration_districts
    );
    let b = &alerts.alert_breakdown;
    let _ = writeln!(
        out,
        "Breakdown: very_high={} high={} normal={} low={} very_low={}",
        b.very_high, b.high, b.normal, b.low, b.very_low
    );
    let _ = writeln!(out, "\nDistricts by migration score:");
    for alert in &alerts.all_alerts {
        let _ = writeln!(
            out,
            "  {}: {:.2} ({}) - {} demographic updates",
            alert.district, alert.migration_score, alert.alert_level, alert.total_updates
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::indices::derive_indices;
    use crate::pipeline::reconciler::MergedRow;
    use crate::types::LoadReport;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn writes_all_sections_even_for_an_empty_snapshot() {
        let dir = tempdir().unwrap();
        let written = write_master_report(&AnalysisSnapshot::empty(), dir.path()).unwrap();
        assert_eq!(written.len(), 5);
        for path in written {
            assert!(path.exists());
        }
    }

    #[test]
    fn enrollment_section_lists_age_breakdown() {
        let row = MergedRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            district: "Pune".to_string(),
            enrollment: [
                ("age_0_5".to_string(), 10.0),
                ("age_5_17".to_string(), 20.0),
                ("age_18_greater".to_string(), 70.0),
            ]
            .into(),
            biometric: Default::default(),
            demographic: Default::default(),
        };
        let snapshot = AnalysisSnapshot::new(derive_indices(vec![row]), LoadReport::default());

        let section = enrollment_section(&snapshot);
        assert!(section.contains("Total enrollments: 100"));
        assert!(section.contains("Age 0-5: 10 (10.0%)"));
        assert!(section.contains("1. Pune: 100"));
    }
}

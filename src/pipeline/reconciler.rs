//! Reconciliation of the three cleaned feeds onto one (date, district) key.
//!
//! Within a source, same-day same-district rows are additive: two batches
//! filed on one day simply sum. Across sources a full outer merge keeps
//! every key seen anywhere, zero-filling the columns of the sources that
//! had no row for it. Rows carrying the invalid-date sentinel never reach
//! the merged table; the load report accounts for them.

use crate::types::{FeedFrame, SourceKind};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Composite aggregation key.
pub type GroupKey = (NaiveDate, String);

/// One outer-merged row: the summed counters of each source for a key.
#[derive(Debug, Clone)]
pub struct MergedRow {
    pub date: NaiveDate,
    pub district: String,
    pub enrollment: BTreeMap<String, f64>,
    pub biometric: BTreeMap<String, f64>,
    pub demographic: BTreeMap<String, f64>,
}

/// Groups a frame by (date, district), summing every counter within a group.
pub fn group_by_day_district(frame: &FeedFrame) -> BTreeMap<GroupKey, BTreeMap<String, f64>> {
    let mut groups: BTreeMap<GroupKey, BTreeMap<String, f64>> = BTreeMap::new();
    for row in &frame.rows {
        let date = match row.date {
            Some(d) => d,
            None => continue,
        };
        let group = groups
            .entry((date, row.district.clone()))
            .or_insert_with(|| zero_counters(&frame.columns));
        for (name, value) in &row.counters {
            *group.entry(name.clone()).or_insert(0.0) += value;
        }
    }
    groups
}

/// Full outer merge of the three grouped feeds. Every key present in any
/// source appears exactly once; a source with no row for a key contributes
/// its full column set as zeros. Column names colliding with an earlier
/// source are suffixed by origin rather than overwritten.
pub fn reconcile(
    enrollment: &FeedFrame,
    biometric: &FeedFrame,
    demographic: &FeedFrame,
) -> Vec<MergedRow> {
    let enroll_columns = enrollment.columns.clone();
    let bio_columns = disambiguate(
        &biometric.columns,
        &[&enroll_columns],
        SourceKind::Biometric,
    );
    let demo_columns = disambiguate(
        &demographic.columns,
        &[&enroll_columns, &bio_columns],
        SourceKind::Demographic,
    );

    let enroll_groups = group_by_day_district(enrollment);
    let bio_groups = rename_groups(group_by_day_district(biometric), &biometric.columns, &bio_columns);
    let demo_groups = rename_groups(
        group_by_day_district(demographic),
        &demographic.columns,
        &demo_columns,
    );

    let mut keys: BTreeSet<GroupKey> = BTreeSet::new();
    keys.extend(enroll_groups.keys().cloned());
    keys.extend(bio_groups.keys().cloned());
    keys.extend(demo_groups.keys().cloned());

    keys.into_iter()
        .map(|key| {
            let (date, district) = key.clone();
            MergedRow {
                date,
                district,
                enrollment: source_counters(&enroll_groups, &key, &enroll_columns),
                biometric: source_counters(&bio_groups, &key, &bio_columns),
                demographic: source_counters(&demo_groups, &key, &demo_columns),
            }
        })
        .collect()
}

fn zero_counters(columns: &[String]) -> BTreeMap<String, f64> {
    columns.iter().map(|c| (c.clone(), 0.0)).collect()
}

fn source_counters(
    groups: &BTreeMap<GroupKey, BTreeMap<String, f64>>,
    key: &GroupKey,
    columns: &[String],
) -> BTreeMap<String, f64> {
    match groups.get(key) {
        Some(counters) => counters.clone(),
        None => zero_counters(columns),
    }
}

/// Suffixes column names that already appear in an earlier source.
fn disambiguate(columns: &[String], earlier: &[&Vec<String>], source: SourceKind) -> Vec<String> {
    columns
        .iter()
        .map(|name| {
            if earlier.iter().any(|cols| cols.contains(name)) {
                format!("{}{}", name, source.merge_suffix())
            } else {
                name.clone()
            }
        })
        .collect()
}

fn rename_groups(
    groups: BTreeMap<GroupKey, BTreeMap<String, f64>>,
    original: &[String],
    renamed: &[String],
) -> BTreeMap<GroupKey, BTreeMap<String, f64>> {
    if original == renamed {
        return groups;
    }
    let mapping: BTreeMap<&String, &String> = original.iter().zip(renamed.iter()).collect();
    groups
        .into_iter()
        .map(|(key, counters)| {
            let renamed_counters = counters
                .into_iter()
                .map(|(name, value)| {
                    let name = mapping.get(&name).map(|n| (*n).clone()).unwrap_or(name);
                    (name, value)
                })
                .collect();
            (key, renamed_counters)
        })
        .collect()
}

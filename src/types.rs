use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three periodic feeds the platform ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Enrollment,
    Biometric,
    Demographic,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Enrollment,
        SourceKind::Biometric,
        SourceKind::Demographic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Enrollment => "enrollment",
            SourceKind::Biometric => "biometric",
            SourceKind::Demographic => "demographic",
        }
    }

    /// Prefix of the counter columns that feed this source's total.
    pub fn counter_prefix(&self) -> &'static str {
        match self {
            SourceKind::Enrollment => "age_",
            SourceKind::Biometric => "bio_",
            SourceKind::Demographic => "demo_",
        }
    }

    /// Suffix used to disambiguate colliding column names at merge time.
    pub fn merge_suffix(&self) -> &'static str {
        match self {
            SourceKind::Enrollment => "_enroll",
            SourceKind::Biometric => "_bio",
            SourceKind::Demographic => "_demo",
        }
    }

    /// Counter schema substituted when a feed cannot be read at all.
    pub fn fallback_columns(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Enrollment => &["age_0_5", "age_5_17", "age_18_greater"],
            SourceKind::Biometric => &["bio_age_5_17", "bio_age_17_"],
            SourceKind::Demographic => &["demo_age_5_17", "demo_age_17_"],
        }
    }
}

/// One cleaned row from a feed. `date` is None when the source value did not
/// parse; the row is kept so the load report can count it, but it never
/// reaches the aggregated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRecord {
    pub date: Option<NaiveDate>,
    pub district: String,
    pub counters: BTreeMap<String, f64>,
}

/// A cleaned feed: its counter schema plus zero or more rows. The schema is
/// carried separately so an empty frame still describes its columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedFrame {
    pub source: SourceKind,
    pub columns: Vec<String>,
    pub rows: Vec<FeedRecord>,
}

impl FeedFrame {
    /// Correctly-shaped zero-row frame, used when a feed is unreadable.
    pub fn empty(source: SourceKind) -> Self {
        Self {
            source,
            columns: source
                .fallback_columns()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: Vec::new(),
        }
    }
}

/// Per-source outcome of a load pass.
#[derive(Debug, Clone, Serialize)]
pub struct SourceLoadStats {
    pub source: SourceKind,
    pub rows: usize,
    pub invalid_dates: usize,
    /// True when the feed was unreadable and an empty frame was substituted.
    pub degraded: bool,
}

/// Outcome of loading all three feeds. A degraded source is not an error:
/// downstream stages see it as zero activity for every key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub sources: Vec<SourceLoadStats>,
}

impl LoadReport {
    pub fn degraded_sources(&self) -> Vec<SourceKind> {
        self.sources
            .iter()
            .filter(|s| s.degraded)
            .map(|s| s.source)
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.sources.iter().any(|s| s.degraded)
    }

    pub fn total_rows(&self) -> usize {
        self.sources.iter().map(|s| s.rows).sum()
    }
}

/// One reconciled (date, district) row with derived totals and indices.
/// Built once per pipeline run and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedRow {
    pub date: NaiveDate,
    pub district: String,
    pub enrollment: BTreeMap<String, f64>,
    pub biometric: BTreeMap<String, f64>,
    pub demographic: BTreeMap<String, f64>,
    pub total_enrollment: f64,
    pub total_biometric: f64,
    pub total_demographic: f64,
    /// Floored at 1 when the three totals are all zero, so it is always a
    /// safe divisor.
    pub total_activity: f64,
    pub ivi: f64,
    pub bsr: f64,
    pub api: f64,
    /// Legacy alias for `api`; always the identical value.
    pub stress_index: f64,
    pub migration_intensity: f64,
}

impl AggregatedRow {
    fn enrollment_counter(&self, name: &str) -> f64 {
        self.enrollment.get(name).copied().unwrap_or(0.0)
    }

    pub fn age_0_5(&self) -> f64 {
        self.enrollment_counter("age_0_5")
    }

    pub fn age_5_17(&self) -> f64 {
        self.enrollment_counter("age_5_17")
    }

    pub fn age_18_greater(&self) -> f64 {
        self.enrollment_counter("age_18_greater")
    }
}

/// Fixed domain constants for index weights, resource planning and costing.
/// These are design assumptions inherited from the governance analytics team,
/// not values derived from the data. Do not tune them per deployment.

// Pressure-index weights per operation type (relative processing effort)
pub const ENROLLMENT_WEIGHT: f64 = 1.0;
pub const BIOMETRIC_WEIGHT: f64 = 0.5;
pub const DEMOGRAPHIC_WEIGHT: f64 = 0.2;

/// Daily operations one enrollment kit can absorb.
pub const KIT_DAILY_CAPACITY: f64 = 50.0;

/// Operations one staff member can handle over the observation window.
pub const STAFF_OPS_CAPACITY: f64 = 10_000.0;

// Mean pressure-index thresholds for priority classification
pub const CRITICAL_STRESS_THRESHOLD: f64 = 200.0;
pub const ELEVATED_STRESS_THRESHOLD: f64 = 100.0;

/// Mean migration-intensity above which a district is flagged as high in-migration.
pub const HIGH_MIGRATION_THRESHOLD: f64 = 5.0;

// Migration alert-level cut points (very high / high / normal / low)
pub const MIGRATION_VERY_HIGH: f64 = 7.0;
pub const MIGRATION_HIGH: f64 = 5.0;
pub const MIGRATION_NORMAL: f64 = 3.0;
pub const MIGRATION_LOW: f64 = 1.0;

/// Per-period compounding factor for the naive stress forecast (5% growth).
pub const FORECAST_GROWTH_RATE: f64 = 1.05;

/// Default number of forecast periods when the caller does not specify one.
pub const DEFAULT_FORECAST_PERIODS: usize = 3;

// Cost assumptions in INR
pub const COST_PER_ENROLLMENT: f64 = 150.0;
pub const COST_PER_BIOMETRIC: f64 = 75.0;
pub const COST_PER_DEMOGRAPHIC: f64 = 50.0;
/// 5 lakhs per enrollment kit.
pub const COST_PER_KIT: f64 = 500_000.0;
/// 6 lakhs per staff member annually.
pub const COST_PER_STAFF_ANNUAL: f64 = 600_000.0;

/// Efficiency gain assumed from better resource allocation.
pub const OPTIMIZATION_SAVINGS_RATE: f64 = 0.10;

/// One crore in rupees, for report formatting.
pub const INR_CRORE: f64 = 10_000_000.0;

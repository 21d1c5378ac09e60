pub mod config;
pub mod constants;
pub mod district;
pub mod error;
pub mod insights;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod snapshot;
pub mod types;

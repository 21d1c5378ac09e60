//! Metrics infrastructure. Installs a Prometheus recorder once per process;
//! the handle is kept for in-process rendering so the HTTP surface can serve
//! scrapes without a separate listener.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already set");
            }
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Render current metrics in Prometheus exposition format, if the recorder
/// is installed.
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

use std::sync::Arc;

use kubetrail_admission::AdmissionHandler;
use kubetrail_queue::ProcessorMetrics;

/// Shared across all request handlers.
pub struct AppState {
    pub handler: AdmissionHandler,
    pub processor_metrics: Arc<ProcessorMetrics>,
}

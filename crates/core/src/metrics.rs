//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Dispatcher (outcomes per output type, end-to-end duration)
//! - Engines (transcode duration)
//! - External services (prober, transcoder, link resolver, downloads, analytics)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Dispatcher Metrics
// =============================================================================

/// Dispatch outcomes total by output type and result.
pub static DISPATCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediarelay_dispatch_total", "Total dispatched requests"),
        &["output", "result"], // result: "delivered", "rejected", "silent"
    )
    .unwrap()
});

/// Dispatch duration in seconds.
pub static DISPATCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediarelay_dispatch_duration_seconds",
            "Duration of a request from intake to outcome",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Rejections total by failure reason.
pub static REJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediarelay_rejections_total", "Total rejected requests"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Engine Metrics
// =============================================================================

/// Transcode duration in seconds.
pub static TRANSCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediarelay_transcode_duration_seconds",
            "Duration of transcoder runs",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["output"],
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_external_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediarelay_external_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0]),
        &["service", "operation"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Dispatcher
        Box::new(DISPATCH_TOTAL.clone()),
        Box::new(DISPATCH_DURATION.clone()),
        Box::new(REJECTIONS_TOTAL.clone()),
        // Engines
        Box::new(TRANSCODE_DURATION.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
    ]
}

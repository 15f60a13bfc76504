//! Rewriter metrics.
//!
//! # Metrics
//! - `rewriter_pipelines_total` (counter): processors built, by mode
//! - `rewriter_pipeline_errors_total` (counter): setup and streaming failures, by kind
//! - `rewriter_config_reloads_total` (counter): applied configuration changes, by change type
//! - `rewriter_active_processors` (gauge): size of the active processor list
//! - `rewriter_registry_rebuilds_total` (counter): global transformer cache rebuilds

use metrics::{counter, gauge};

pub fn record_pipeline(mode: &'static str) {
    counter!("rewriter_pipelines_total", "mode" => mode).increment(1);
}

pub fn record_pipeline_error(kind: &'static str) {
    counter!("rewriter_pipeline_errors_total", "kind" => kind).increment(1);
}

pub fn record_config_reload(change: &'static str) {
    counter!("rewriter_config_reloads_total", "change" => change).increment(1);
}

pub fn record_active_processors(count: usize) {
    gauge!("rewriter_active_processors").set(count as f64);
}

pub fn record_registry_rebuild() {
    counter!("rewriter_registry_rebuilds_total").increment(1);
}

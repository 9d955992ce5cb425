use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref OBSERVATIONS_INGESTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "director_observations_ingested_total",
        "Total number of observations ingested",
        &["success"]
    )
    .unwrap();

    pub static ref STRUGGLE_FINDINGS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "director_struggle_findings_total",
        "Total number of classifier findings recorded",
        &["kind"]
    )
    .unwrap();

    pub static ref STRUGGLES_RESOLVED_TOTAL: IntCounter = register_int_counter!(
        "director_struggles_resolved_total",
        "Total number of struggles marked resolved"
    )
    .unwrap();

    pub static ref INTERVENTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "director_interventions_total",
        "Total number of interventions issued",
        &["kind", "source"]
    )
    .unwrap();

    pub static ref GENERATIVE_FALLBACKS_TOTAL: IntCounter = register_int_counter!(
        "director_generative_fallbacks_total",
        "Generative backend failures that fell back to the static catalog"
    )
    .unwrap();
}

pub fn record_observation(success: bool) {
    let label = if success { "true" } else { "false" };
    OBSERVATIONS_INGESTED_TOTAL.with_label_values(&[label]).inc();
}

pub fn record_finding(kind: &str) {
    STRUGGLE_FINDINGS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_intervention(kind: &str, source: &str) {
    INTERVENTIONS_TOTAL.with_label_values(&[kind, source]).inc();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

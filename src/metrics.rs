use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{opts, register_int_counter, Encoder, IntCounter, TextEncoder};

pub static CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "parley_connections_total",
        "Total number of live client connections accepted"
    ))
    .unwrap()
});

pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "parley_messages_sent_total",
        "Total number of messages persisted"
    ))
    .unwrap()
});

pub static EVENTS_DELIVERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "parley_events_delivered_total",
        "Total number of live events handed to connections"
    ))
    .unwrap()
});

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

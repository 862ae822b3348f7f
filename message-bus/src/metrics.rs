//! Prometheus metrics for bus traffic

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Messages published, labeled by type and status
    pub static ref MESSAGE_PUBLISH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "bus_message_publish_total",
        "Messages published to the coordination gateway",
        &["message_type", "status"]
    )
    .unwrap();

    /// Publish latency, labeled by type
    pub static ref MESSAGE_PUBLISH_DURATION: HistogramVec = register_histogram_vec!(
        "bus_message_publish_duration_seconds",
        "Publish latency by message type",
        &["message_type"]
    )
    .unwrap();

    /// Messages received, labeled by type and status
    pub static ref MESSAGE_RECEIVE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "bus_message_receive_total",
        "Messages received from the coordination gateway",
        &["message_type", "status"]
    )
    .unwrap();
}

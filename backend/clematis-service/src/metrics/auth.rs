use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Rejected session checks by reason (missing_headers, unknown_token, client_mismatch, store_error).
    pub static ref SESSION_REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "session_rejections_total",
        "Requests rejected by the session guard segmented by reason",
        &["reason"]
    )
    .expect("failed to register session_rejections_total");
}

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Duration of feed assembly by feed kind (home, popular, promoted, profile, search).
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "feed_request_duration_seconds",
        "Feed assembly duration segmented by feed kind",
        &["kind"]
    )
    .expect("failed to register feed_request_duration_seconds");

    /// Total feed requests by kind and outcome (ok, transient, error).
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_request_total",
        "Total feed requests segmented by feed kind and outcome",
        &["kind", "outcome"]
    )
    .expect("failed to register feed_request_total");

    /// Records returned per page.
    pub static ref FEED_PAGE_SIZE: HistogramVec = register_histogram_vec!(
        "feed_page_records",
        "Number of records on an assembled feed page segmented by feed kind",
        &["kind"],
        vec![0.0, 1.0, 5.0, 10.0, 15.0, 20.0]
    )
    .expect("failed to register feed_page_records");

    /// Tag usage upserts (created/incremented).
    pub static ref TAG_UPSERT_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tag_upsert_total",
        "Tag usage upserts segmented by result",
        &["result"]
    )
    .expect("failed to register tag_upsert_total");
}

//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the service installs a Prometheus
//! recorder, tests and the CLI run without one.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

pub const RUNS_TOTAL: &str = "imagery_runs_total";
pub const CACHE_HITS_TOTAL: &str = "imagery_cache_hits_total";
pub const CLAIMS_CONTENDED_TOTAL: &str = "imagery_claims_contended_total";
pub const DOWNLOADS_TOTAL: &str = "imagery_downloads_total";
pub const DOWNLOAD_BYTES_TOTAL: &str = "imagery_download_bytes_total";
pub const STAGE_DURATION_SECONDS: &str = "imagery_stage_duration_seconds";

/// Register descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(RUNS_TOTAL, "Pipeline invocations by outcome");
    describe_counter!(CACHE_HITS_TOTAL, "Invocations answered from the artifact cache");
    describe_counter!(
        CLAIMS_CONTENDED_TOTAL,
        "Invocations that waited on another invocation's claim"
    );
    describe_counter!(DOWNLOADS_TOTAL, "Raw files downloaded from the archive");
    describe_counter!(DOWNLOAD_BYTES_TOTAL, Unit::Bytes, "Raw bytes downloaded");
    describe_histogram!(STAGE_DURATION_SECONDS, Unit::Seconds, "Duration of each pipeline stage");
}

pub fn record_run(outcome: &'static str) {
    counter!(RUNS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_cache_hit() {
    counter!(CACHE_HITS_TOTAL).increment(1);
}

pub fn record_contended_claim() {
    counter!(CLAIMS_CONTENDED_TOTAL).increment(1);
}

pub fn record_download(bytes: u64) {
    counter!(DOWNLOADS_TOTAL).increment(1);
    counter!(DOWNLOAD_BYTES_TOTAL).increment(bytes);
}

pub fn record_stage(stage: &'static str, elapsed: Duration) {
    histogram!(STAGE_DURATION_SECONDS, "stage" => stage).record(elapsed.as_secs_f64());
}

//! Metrics definitions for the report pipeline.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REPORT_CACHE_HIT: MetricDef = MetricDef {
    name: "report_cache.hit",
    metric_type: MetricType::Counter,
    description: "Report requests served from the cache",
};

pub const REPORT_CACHE_MISS: MetricDef = MetricDef {
    name: "report_cache.miss",
    metric_type: MetricType::Counter,
    description: "Report requests that fell through to a foreground fetch",
};

pub const REPORT_POLL_ATTEMPTS: MetricDef = MetricDef {
    name: "report_fetch.poll_attempts",
    metric_type: MetricType::Histogram,
    description: "Poll attempts needed before a report became ready",
};

pub const REFRESH_OK: MetricDef = MetricDef {
    name: "report_refresh.ok",
    metric_type: MetricType::Counter,
    description: "Background refreshes that completed",
};

pub const REFRESH_FAILED: MetricDef = MetricDef {
    name: "report_refresh.failed",
    metric_type: MetricType::Counter,
    description: "Background refreshes that failed and were discarded",
};

pub const REFRESH_QUEUE_FULL: MetricDef = MetricDef {
    name: "report_refresh.queue_full",
    metric_type: MetricType::Counter,
    description: "Refresh jobs dropped because the queue was full",
};

pub const NEGATIVE_CACHE_HIT: MetricDef = MetricDef {
    name: "negative_cache.hit",
    metric_type: MetricType::Counter,
    description: "Account lookups short-circuited by the negative cache",
};

pub const NEGATIVE_CACHE_MISS: MetricDef = MetricDef {
    name: "negative_cache.miss",
    metric_type: MetricType::Counter,
    description: "Account lookups that missed the negative cache",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REPORT_CACHE_HIT,
    REPORT_CACHE_MISS,
    REPORT_POLL_ATTEMPTS,
    REFRESH_OK,
    REFRESH_FAILED,
    REFRESH_QUEUE_FULL,
    NEGATIVE_CACHE_HIT,
    NEGATIVE_CACHE_MISS,
];

//! Shaping of raw statistics rows into what the dashboard consumes. The
//! metric positions are fixed by the query in `client.rs`.

use crate::client::StatRow;
use serde::Serialize;

/// One aggregated row per traffic source over the requested range.
#[derive(Debug, Serialize, PartialEq)]
pub struct TrafficSummary {
    pub traffic_source: String,
    pub total_visits: i64,
    pub total_users: i64,
    pub avg_bounce_rate: f64,
    pub avg_page_depth: f64,
    pub avg_visit_duration: String,
}

/// One per-day row for the chart view.
#[derive(Debug, Serialize, PartialEq)]
pub struct ChartPoint {
    pub date: String,
    pub traffic_source: String,
    pub visits: f64,
    pub users: f64,
    pub bounce_rate: f64,
    pub page_depth: f64,
    pub avg_visit_duration: String,
}

/// Render a duration in seconds as "M:SS".
fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as i64;
    let secs = (seconds % 60.0).floor() as i64;
    format!("{minutes}:{secs:02}")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn summarize(rows: &[StatRow]) -> Vec<TrafficSummary> {
    rows.iter()
        .filter_map(|row| {
            let source = row.dimensions.first()?.name.clone();
            let m = &row.metrics;
            if m.len() < 5 {
                return None;
            }
            Some(TrafficSummary {
                traffic_source: source,
                total_visits: m[0] as i64,
                total_users: m[1] as i64,
                avg_bounce_rate: round2(m[2]),
                avg_page_depth: round2(m[3]),
                avg_visit_duration: format_duration(m[4]),
            })
        })
        .collect()
}

/// Expects rows grouped by (traffic source, date); output is sorted by date
/// so the chart reads chronologically.
pub fn chart_points(rows: &[StatRow]) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = rows
        .iter()
        .filter_map(|row| {
            let source = row.dimensions.first()?.name.clone();
            let date = row.dimensions.get(1)?.name.clone();
            let m = &row.metrics;
            if m.len() < 5 {
                return None;
            }
            Some(ChartPoint {
                date,
                traffic_source: source,
                visits: m[0],
                users: m[1],
                bounce_rate: m[2],
                page_depth: m[3],
                avg_visit_duration: format_duration(m[4]),
            })
        })
        .collect();

    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

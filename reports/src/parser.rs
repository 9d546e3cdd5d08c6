//! Parser for the tabular (tab-separated) report payload the remote service
//! produces. The payload layout is fixed: a metadata banner, one header line,
//! data rows, and a trailing totals line.

use crate::errors::ReportError;
use indexmap::IndexMap;

/// One reporting row, keyed by column header. Field order follows the header
/// line and row order follows the payload, both carried through JSON output.
pub type ReportRow = IndexMap<String, String>;

/// Parse a raw report body into rows. Pure; the only failure is a payload
/// too short to contain the banner, the header and at least one data line.
pub fn parse(text: &str) -> Result<Vec<ReportRow>, ReportError> {
    let lines: Vec<&str> = text.trim().split('\n').collect();

    if lines.len() < 3 {
        return Err(ReportError::Malformed(format!(
            "expected at least 3 lines, got {}",
            lines.len()
        )));
    }

    let headers: Vec<&str> = lines[1].split('\t').collect();

    // Everything between the header and the totals line is data. A row with
    // fewer fields than the header yields a partial mapping; extra fields
    // are dropped.
    let rows = lines[2..lines.len() - 1]
        .iter()
        .map(|row| {
            headers
                .iter()
                .zip(row.split('\t'))
                .map(|(header, value)| ((*header).to_string(), value.to_string()))
                .collect()
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(headers: &[&str], rows: &[&[&str]]) -> String {
        let mut lines = vec!["\"Report for test (2025-01-01 - 2025-01-31)\"".to_string()];
        lines.push(headers.join("\t"));
        for row in rows {
            lines.push(row.join("\t"));
        }
        lines.push("Total rows: footer".to_string());
        lines.join("\n")
    }

    #[test]
    fn parses_rows_in_order() {
        let text = payload(
            &["CampaignId", "Date", "Clicks"],
            &[
                &["1", "2025-01-01", "10"],
                &["1", "2025-01-02", "12"],
                &["2", "2025-01-01", "3"],
            ],
        );

        let rows = parse(&text).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Date"], "2025-01-01");
        assert_eq!(rows[1]["Clicks"], "12");
        assert_eq!(rows[2]["CampaignId"], "2");

        // Field order follows the header line.
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, ["CampaignId", "Date", "Clicks"]);
    }

    #[test]
    fn round_trips_synthetic_payloads() {
        let headers = ["A", "B", "C", "D"];
        for n in 1..=8 {
            let rows: Vec<Vec<String>> = (0..n)
                .map(|i| headers.iter().map(|h| format!("{h}{i}")).collect())
                .collect();
            let row_refs: Vec<Vec<&str>> = rows
                .iter()
                .map(|r| r.iter().map(String::as_str).collect())
                .collect();
            let slices: Vec<&[&str]> = row_refs.iter().map(Vec::as_slice).collect();

            let parsed = parse(&payload(&headers, &slices)).unwrap();
            assert_eq!(parsed.len(), n);
            for (i, row) in parsed.iter().enumerate() {
                for header in &headers {
                    assert_eq!(row[*header], format!("{header}{i}"));
                }
            }
        }
    }

    #[test]
    fn rejects_short_payloads() {
        for text in ["", "banner", "banner\nA\tB"] {
            assert!(matches!(parse(text), Err(ReportError::Malformed(_))));
        }
    }

    #[test]
    fn short_row_yields_partial_mapping() {
        let text = payload(&["CampaignId", "Date", "Clicks"], &[&["1", "2025-01-01"]]);

        let rows = parse(&text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["CampaignId"], "1");
        assert!(!rows[0].contains_key("Clicks"));
    }

    #[test]
    fn trailing_totals_line_is_dropped() {
        let text = "banner\nClicks\n10\n12\nTotal: 22";
        let rows = parse(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Clicks"], "12");
    }
}

//! Table detection and reconstruction for plain-text excerpts.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::ExpandedTable;

/// A bare row number such as "1" or "12.".
static BARE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.?$").unwrap_or_else(|e| unreachable!("invalid row number pattern: {e}"))
});

const SCHEDULE_MARKER: &str = "[schedule";
const TABLE_MARKERS: &[&str] = &["[table", "[columns"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Heuristic for excerpts lifted from schedules or tables.
///
/// Tabular excerpts never go through a direct section lookup.
pub fn looks_tabular(excerpt: &str) -> bool {
    let lower = excerpt.to_lowercase();
    excerpt.contains('|')
        || lower.contains(SCHEDULE_MARKER)
        || TABLE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Parse pipe-delimited text into headers and rows, or `None` if it is not a table.
pub fn parse_table_from_text(text: &str) -> Option<TextTable> {
    if text.matches('|').count() < 2 {
        return None;
    }
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }

    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| {
            line.split('|')
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();
    if rows.len() < 2 {
        return None;
    }

    let first_is_numbered = rows[0]
        .first()
        .is_some_and(|cell| BARE_NUMBER_RE.is_match(cell));

    if first_is_numbered {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let headers = (1..=width).map(|i| format!("Column {i}")).collect();
        Some(TextTable { headers, rows })
    } else {
        let mut rows = rows.into_iter();
        let headers = rows.next().unwrap_or_default();
        Some(TextTable {
            headers,
            rows: rows.collect(),
        })
    }
}

/// Tidy structured tables from the expansion endpoint.
pub fn normalize_tables(tables: Vec<ExpandedTable>) -> Vec<ExpandedTable> {
    tables
        .into_iter()
        .filter_map(|table| {
            let mut kept_headers = Vec::new();
            let mut rows = Vec::new();
            for (i, row) in table.rows.into_iter().enumerate() {
                let row: Vec<String> = row.iter().map(|c| c.trim().to_string()).collect();
                if row.iter().all(String::is_empty) {
                    continue;
                }
                if table.header_rows.contains(&i) {
                    kept_headers.push(rows.len());
                }
                rows.push(row);
            }
            if rows.is_empty() {
                return None;
            }
            Some(ExpandedTable {
                rows,
                header_rows: kept_headers,
                section: table.section,
            })
        })
        .collect()
}

impl ExpandedTable {
    /// Split into headers (first header row) and body (every non-header row).
    pub fn to_text_table(&self) -> TextTable {
        let headers = self
            .header_rows
            .iter()
            .find_map(|&i| self.rows.get(i))
            .cloned()
            .unwrap_or_default();
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.header_rows.contains(i))
            .map(|(_, row)| row.clone())
            .collect();
        TextTable { headers, rows }
    }
}

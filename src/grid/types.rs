// src/grid/types.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static DATE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date header regex should compile"));

/// Strict `YYYY-MM-DD` column label. Only these ever count as new grid columns.
pub fn is_date_like(header: &str) -> bool {
    DATE_HEADER.is_match(header)
}

/// What the grid rendered at one moment: the visible window of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl GridSnapshot {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }
}

/// Wide table accumulated across scans.
///
/// Headers are unique and in first-seen order; every row is exactly as wide
/// as the header list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl AssembledTable {
    /// Seed from the first scan. Repeated headers keep their first column only.
    pub fn seed(snapshot: GridSnapshot) -> Self {
        let mut seen = HashSet::new();
        let keep: Vec<bool> = snapshot
            .headers
            .iter()
            .map(|h| seen.insert(h.clone()))
            .collect();
        let headers: Vec<String> = snapshot
            .headers
            .into_iter()
            .zip(&keep)
            .filter_map(|(h, &k)| k.then_some(h))
            .collect();
        let width = headers.len();

        let rows = snapshot
            .rows
            .into_iter()
            .map(|row| {
                let mut row: Vec<String> = row
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| keep.get(*i).copied().unwrap_or(false))
                    .map(|(_, cell)| cell)
                    .collect();
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { headers, rows }
    }

    /// Date headers in `snapshot` not yet present here, in snapshot order.
    pub fn unseen_dates(&self, snapshot: &GridSnapshot) -> Vec<String> {
        let known: HashSet<&str> = self.headers.iter().map(String::as_str).collect();
        let mut fresh: Vec<String> = Vec::new();
        for h in &snapshot.headers {
            if is_date_like(h) && !known.contains(h.as_str()) && !fresh.contains(h) {
                fresh.push(h.clone());
            }
        }
        fresh
    }

    /// Fold the given new columns out of `snapshot` into the table.
    ///
    /// Cells are matched to existing rows by row index. Rows the snapshot does
    /// not reach get empty cells; rows past the known count are created with
    /// empty cells under every previously known header.
    pub fn with_columns(mut self, snapshot: &GridSnapshot, new_cols: &[String]) -> Self {
        if new_cols.is_empty() {
            return self;
        }
        let indices: Vec<Option<usize>> = new_cols
            .iter()
            .map(|c| snapshot.headers.iter().position(|h| h == c))
            .collect();
        let prior_width = self.headers.len();

        for (i, snap_row) in snapshot.rows.iter().enumerate() {
            let cells = indices.iter().map(|&idx| {
                idx.and_then(|idx| snap_row.get(idx))
                    .cloned()
                    .unwrap_or_default()
            });
            match self.rows.get_mut(i) {
                Some(row) => row.extend(cells),
                None => {
                    let mut row = vec![String::new(); prior_width];
                    row.extend(cells);
                    self.rows.push(row);
                }
            }
        }

        self.headers.extend(new_cols.iter().cloned());
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        self
    }

    /// Force every row to exactly the header width.
    pub fn normalized(mut self) -> Self {
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.headers, self.rows)
    }
}

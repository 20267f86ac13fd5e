// src/panel/table.rs

use super::clean::clean_cell;
use super::employees::EmployeeYearTable;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

pub const DATE_COLUMN: &str = "Date";
pub const EMPLOYEES_COLUMN: &str = "Employees";

/// Date-indexed table: one row per calendar date (ascending), one column per
/// `{panel_slug}_{metric}` plus `Employees`. Cells are `None` when a panel had
/// no value for that date or the value could not be read as a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedTable {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

/// Bookkeeping from turning one wide grid into date rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WideConversion {
    /// Non-empty cells that were not numeric.
    pub coerced: usize,
    /// Date-column headers that did not parse as dates.
    pub skipped_headers: usize,
    /// Metric rows dropped for a missing or repeated label.
    pub skipped_rows: usize,
}

impl UnifiedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transpose a metric-by-date wide table into date rows, cleaning every
    /// cell and naming each column `{slug}_{metric}`.
    ///
    /// `headers[0]` labels the metric column; the rest are `YYYY-MM-DD` dates.
    pub fn from_wide(slug: &str, headers: &[String], rows: &[Vec<String>]) -> (Self, WideConversion) {
        let mut stats = WideConversion::default();

        let dates: Vec<(usize, NaiveDate)> = headers
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, h)| match NaiveDate::parse_from_str(h.trim(), "%Y-%m-%d") {
                Ok(d) => Some((i, d)),
                Err(_) => {
                    debug!(header = %h, "not a date column");
                    stats.skipped_headers += 1;
                    None
                }
            })
            .collect();

        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> =
            dates.iter().map(|&(_, d)| (d, Vec::new())).collect();

        for row in rows {
            let label = row.first().map(|l| l.trim()).unwrap_or_default();
            if label.is_empty() {
                stats.skipped_rows += 1;
                continue;
            }
            let name = format!("{}_{}", slug, label);
            if !seen.insert(name.clone()) {
                warn!(column = %name, "repeated metric label; keeping the first row");
                stats.skipped_rows += 1;
                continue;
            }
            columns.push(name);

            for &(i, date) in &dates {
                let raw = row.get(i).map(String::as_str).unwrap_or_default();
                let value = clean_cell(raw);
                if value.is_none() && !raw.trim().is_empty() {
                    stats.coerced += 1;
                }
                if let Some(cells) = by_date.get_mut(&date) {
                    cells.push(value);
                }
            }
        }

        if columns.is_empty() {
            by_date.clear();
        }
        (
            Self {
                columns,
                rows: by_date,
            },
            stats,
        )
    }

    /// Outer join on date: the result has every date of either side, and the
    /// columns of `self` followed by the new columns of `other`. A column
    /// present on both sides takes `other`'s value where it has one.
    pub fn outer_join(mut self, other: UnifiedTable) -> Self {
        let mut slot_of: Vec<usize> = Vec::with_capacity(other.columns.len());
        for col in &other.columns {
            match self.columns.iter().position(|c| c == col) {
                Some(i) => slot_of.push(i),
                None => {
                    self.columns.push(col.clone());
                    slot_of.push(self.columns.len() - 1);
                }
            }
        }
        let width = self.columns.len();

        for cells in self.rows.values_mut() {
            cells.resize(width, None);
        }
        for (date, theirs) in other.rows {
            let cells = self
                .rows
                .entry(date)
                .or_insert_with(|| vec![None; width]);
            for (j, v) in theirs.into_iter().enumerate() {
                if v.is_some() {
                    cells[slot_of[j]] = v;
                }
            }
        }
        self
    }

    /// Attach yearly employee counts to every date of the matching calendar
    /// year. A yearly figure is repeated across all dates in its year.
    pub fn merge_employees(mut self, employees: &EmployeeYearTable) -> Self {
        let slot = match self.columns.iter().position(|c| c == EMPLOYEES_COLUMN) {
            Some(i) => i,
            None => {
                self.columns.push(EMPLOYEES_COLUMN.to_string());
                self.columns.len() - 1
            }
        };
        let width = self.columns.len();
        for (date, cells) in self.rows.iter_mut() {
            cells.resize(width, None);
            cells[slot] = employees.get(date.year()).map(|n| n as f64);
        }
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw cell: `None` if the date, the column or the value is missing.
    pub fn get(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let j = self.columns.iter().position(|c| c == column)?;
        self.rows.get(&date)?.get(j).copied().flatten()
    }

    /// Rows in ascending date order with every missing or non-finite value
    /// replaced by zero.
    pub fn filled_rows(&self) -> Vec<(NaiveDate, Vec<f64>)> {
        let width = self.columns.len();
        self.rows
            .iter()
            .map(|(date, cells)| {
                let mut out: Vec<f64> = cells
                    .iter()
                    .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
                    .collect();
                out.resize(width, 0.0);
                (*date, out)
            })
            .collect()
    }
}

// src/panel/employees.rs

use super::clean::parse_count;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, warn};

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("row selector should parse"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("cell selector should parse"));

/// Yearly employee counts. Short-lived: merged into the unified table by
/// calendar year, then dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeYearTable {
    by_year: BTreeMap<i32, i64>,
}

impl EmployeeYearTable {
    pub fn get(&self, year: i32) -> Option<i64> {
        self.by_year.get(&year).copied()
    }

    pub fn len(&self) -> usize {
        self.by_year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }

    /// First value seen for a year wins.
    pub fn insert(&mut self, year: i32, employees: i64) {
        self.by_year.entry(year).or_insert(employees);
    }
}

impl FromIterator<(i32, i64)> for EmployeeYearTable {
    fn from_iter<I: IntoIterator<Item = (i32, i64)>>(iter: I) -> Self {
        let mut t = Self::default();
        for (year, n) in iter {
            t.insert(year, n);
        }
        t
    }
}

/// Parse the `Year | Employees` table(s) out of raw HTML.
///
/// Only rows with exactly two data cells count; header rows have none.
/// Unparseable counts become zero, rows with an unparseable year are dropped.
pub fn parse_employee_tables(html: &str) -> EmployeeYearTable {
    let doc = Html::parse_fragment(html);

    let mut table = EmployeeYearTable::default();
    for row in doc.select(&ROW_SELECTOR) {
        let cells: Vec<String> = row
            .select(&CELL_SELECTOR)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() != 2 {
            continue;
        }
        let Some(year) = parse_count(&cells[0]).and_then(|y| i32::try_from(y).ok()) else {
            debug!(year = %cells[0], "skipping employee row without a year");
            continue;
        };
        let employees = parse_count(&cells[1]).unwrap_or_else(|| {
            warn!(year, raw = %cells[1], "unparseable employee count; using 0");
            0
        });
        table.insert(year, employees);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
<table class="historical_data_table table">
  <thead><tr><th colspan="2">Apple Number of Employees</th></tr>
         <tr><th>Year</th><th>Employees</th></tr></thead>
  <tbody>
    <tr><td>2023</td><td>161,000</td></tr>
    <tr><td>2022</td><td>164,000</td></tr>
    <tr><td>2021</td><td>N/A</td></tr>
    <tr><td>Total</td><td>1</td></tr>
    <tr><td>2020</td><td>147,000</td><td>extra</td></tr>
  </tbody>
</table>"#;

    #[test]
    fn parses_two_column_rows() {
        let t = parse_employee_tables(HTML);
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(2023), Some(161_000));
        assert_eq!(t.get(2022), Some(164_000));
        assert_eq!(t.get(2021), Some(0));
        assert_eq!(t.get(2020), None);
    }

    #[test]
    fn empty_html_is_empty_table() {
        assert!(parse_employee_tables("").is_empty());
    }

    #[test]
    fn first_year_wins() {
        let t: EmployeeYearTable = vec![(2021, 5), (2021, 9)].into_iter().collect();
        assert_eq!(t.get(2021), Some(5));
    }
}

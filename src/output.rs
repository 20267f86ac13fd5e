// src/output.rs

use crate::panel::{UnifiedTable, DATE_COLUMN};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Render `table` as CSV: `Date` first, then one column per metric, rows in
/// ascending date order, missing values written as `0`.
pub fn to_csv(table: &UnifiedTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(DATE_COLUMN);
    header.extend(table.columns().iter().map(String::as_str));
    wtr.write_record(&header)?;

    for (date, values) in table.filled_rows() {
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(values.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `table` to `path`, creating parent directories.
pub fn write_csv(table: &UnifiedTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, to_csv(table)?).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::EmployeeYearTable;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn sample() -> UnifiedTable {
        let (a, _) = UnifiedTable::from_wide(
            "financials",
            &s(&["Metric", "2023-06-30", "2023-03-31"]),
            &[s(&["Revenue", "1,500", "$1,000"])],
        );
        let (b, _) = UnifiedTable::from_wide(
            "cash_flow_statement",
            &s(&["Metric", "2023-06-30"]),
            &[s(&["Capex", "-12.5"])],
        );
        let emp: EmployeeYearTable = vec![(2023, 42)].into_iter().collect();
        a.outer_join(b).merge_employees(&emp)
    }

    #[test]
    fn csv_has_date_first_and_zero_fill() -> Result<()> {
        let csv = to_csv(&sample())?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Date,financials_Revenue,cash_flow_statement_Capex,Employees",
                "2023-03-31,1000,0,42",
                "2023-06-30,1500,-12.5,42",
            ]
        );
        Ok(())
    }

    #[test]
    fn write_creates_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ACME").join("ACME_combined_quarterly.csv");
        write_csv(&sample(), &path)?;
        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("Date,"));
        assert_eq!(text.lines().count(), 3);
        Ok(())
    }
}

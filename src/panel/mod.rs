// src/panel/mod.rs
//! Panels of the source page and the per-panel data they produce.

pub mod clean;
pub mod employees;
pub mod table;

use serde::Deserialize;

pub use clean::{clean_cell, parse_count};
pub use employees::{parse_employee_tables, EmployeeYearTable};
pub use table::{UnifiedTable, WideConversion, DATE_COLUMN, EMPLOYEES_COLUMN};

/// A named section of the page holding one financial table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Panel {
    pub name: String,
    #[serde(default)]
    pub kind: PanelKind,
}

/// How a panel's data is extracted and merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelKind {
    /// Virtualized metric-by-date grid, merged on exact date.
    #[default]
    Wide,
    /// Plain Year/Employees table behind a nested tab, merged on calendar year.
    EmployeeCount { nested_tab: String },
}

impl Panel {
    pub fn wide(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PanelKind::Wide,
        }
    }

    pub fn employee_count(name: impl Into<String>, nested_tab: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PanelKind::EmployeeCount {
                nested_tab: nested_tab.into(),
            },
        }
    }

    /// Column namespace: lowercased, spaces to underscores, then one pass
    /// folding `__` pairs to `_`. Runs of three or more spaces keep a double
    /// underscore.
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replace(' ', "_").replace("__", "_")
    }

    pub fn default_sequence() -> Vec<Panel> {
        vec![
            Panel::wide("Financials"),
            Panel::wide("Balance Sheet"),
            Panel::wide("Cash Flow Statement"),
            Panel::wide("Key Financial Ratios"),
            Panel::employee_count("Other Metrics", "Employee Count"),
        ]
    }
}

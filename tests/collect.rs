//! End-to-end collection against an in-memory page that behaves like the
//! financials site: an ad overlay, a typeahead search, tab bars, an annual /
//! quarterly switch and a horizontally virtualized grid.

use chrono::NaiveDate;
use finscrape::collect::{PanelOrchestrator, PanelStatus};
use finscrape::config::{Config, Selectors, Timing};
use finscrape::driver::{ElementHandle, Locator, PageDriver};
use finscrape::error::Result;
use finscrape::output;
use finscrape::panel::{Panel, EMPLOYEES_COLUMN};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Date columns the grid renders at once.
const WINDOW: usize = 2;
const THUMB_STEP: f64 = 10.0;

struct Grid {
    dates: Vec<&'static str>,
    rows: Vec<(&'static str, Vec<&'static str>)>,
}

#[derive(Default)]
struct State {
    /// `Some(has_close_button)` while an overlay covers the page.
    overlay: Option<bool>,
    typed: String,
    opened: bool,
    tab: Option<String>,
    nested: bool,
    dropdown_open: bool,
    quarterly: bool,
    offset: usize,
    clicks: Vec<String>,
}

struct FakePage {
    sel: Selectors,
    tabs: Vec<&'static str>,
    grids: HashMap<&'static str, Grid>,
    employees_html: &'static str,
    search_available: bool,
    state: RefCell<State>,
}

const EMPLOYEES_HTML: &str = r#"
<table class="historical_data_table table">
  <thead><tr><th>Year</th><th>Employees</th></tr></thead>
  <tbody>
    <tr><td>2023</td><td>1,250</td></tr>
    <tr><td>2022</td><td>1,100</td></tr>
  </tbody>
</table>
"#;

impl FakePage {
    fn new() -> Self {
        let mut grids = HashMap::new();
        grids.insert(
            "Financials",
            Grid {
                dates: vec!["2023-03-31", "2023-06-30", "2023-09-30"],
                rows: vec![
                    ("Revenue", vec!["$1,000", "$1,100", "$1,200"]),
                    ("EPS", vec!["0.50", "-", "N/A"]),
                ],
            },
        );
        grids.insert(
            "Balance Sheet",
            Grid {
                dates: vec!["2023-06-30", "2023-09-30", "2023-12-31"],
                rows: vec![("Cash", vec!["$10", "$20", "$30"])],
            },
        );
        Self {
            sel: Selectors::default(),
            tabs: vec!["Financials", "Balance Sheet", "Other Metrics"],
            grids,
            employees_html: EMPLOYEES_HTML,
            search_available: true,
            state: RefCell::new(State {
                overlay: Some(true),
                ..Default::default()
            }),
        }
    }

    fn grid(&self) -> Option<&Grid> {
        let st = self.state.borrow();
        if !st.opened || !st.quarterly {
            return None;
        }
        let tab = st.tab.clone()?;
        self.grids.get(tab.as_str())
    }

    fn visible(&self, grid: &Grid) -> std::ops::Range<usize> {
        let offset = self.state.borrow().offset;
        offset..(offset + WINDOW).min(grid.dates.len())
    }

    fn handles(ids: impl IntoIterator<Item = String>) -> Vec<ElementHandle> {
        ids.into_iter().map(ElementHandle).collect()
    }
}

/// Text between the first pair of single quotes.
fn quoted(s: &str) -> Option<&str> {
    s.split('\'').nth(1)
}

impl PageDriver for FakePage {
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let sel = &self.sel;
        let st = self.state.borrow();
        let ids: Vec<String> = match locator {
            Locator::Css(s) if *s == sel.overlay || *s == sel.overlay_residue => {
                st.overlay.iter().map(|_| "overlay".to_string()).collect()
            }
            Locator::XPath(x) if x.contains("js-typeahead") => {
                // only the inner-page placeholder variant exists
                if self.search_available && x.contains("interactive") {
                    vec!["search".into()]
                } else {
                    vec![]
                }
            }
            Locator::Css(s) if *s == sel.search_result => {
                if st.typed.is_empty() {
                    vec![]
                } else {
                    vec!["result".into()]
                }
            }
            Locator::Css(s) if *s == sel.tab_bar => {
                if !st.opened {
                    vec![]
                } else if st.tab.as_deref() == Some("Other Metrics") {
                    vec!["bar0".into(), "bar1".into()]
                } else {
                    vec!["bar0".into()]
                }
            }
            Locator::Css(s) if *s == sel.frequency_select => vec!["freq".into()],
            Locator::Css(s) if *s == sel.frequency_dropdown => vec!["dropdown".into()],
            Locator::XPath(x) if *x == sel.quarterly_option_xpath => {
                if st.dropdown_open {
                    vec!["quarterly".into()]
                } else {
                    vec![]
                }
            }
            Locator::Css(s) if *s == sel.grid => {
                return Ok(Self::handles(self.grid().map(|_| "grid".to_string())));
            }
            Locator::Css(s) if *s == sel.grid_header_cells => {
                let Some(grid) = self.grid() else {
                    return Ok(vec![]);
                };
                let mut ids = vec!["t:Metric".to_string()];
                ids.extend(self.visible(grid).map(|i| format!("t:{}", grid.dates[i])));
                ids
            }
            Locator::Css(s) if *s == sel.grid_rows => {
                let Some(grid) = self.grid() else {
                    return Ok(vec![]);
                };
                (0..grid.rows.len()).map(|r| format!("row:{}", r)).collect()
            }
            l if *l == Locator::id(&sel.scroll_thumb_id) => {
                match self.grid() {
                    Some(g) if g.dates.len() > WINDOW => vec!["thumb".into()],
                    _ => vec![],
                }
            }
            _ => vec![],
        };
        Ok(Self::handles(ids))
    }

    async fn find_all_in(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let sel = &self.sel;
        let id = parent.id();
        let ids: Vec<String> = match (id, locator) {
            ("overlay", Locator::XPath(_)) => {
                if self.state.borrow().overlay == Some(true) {
                    vec!["overlay-close".into()]
                } else {
                    vec![]
                }
            }
            ("bar0", Locator::XPath(x)) => quoted(x)
                .filter(|name| self.tabs.iter().any(|t| t == name))
                .map(|name| format!("tab:{}", name))
                .into_iter()
                .collect(),
            ("bar1", Locator::XPath(x)) => quoted(x)
                .filter(|name| *name == "Employee Count")
                .map(|name| format!("nested:{}", name))
                .into_iter()
                .collect(),
            ("freq", Locator::Css(s)) if *s == sel.frequency_selected_option => vec!["opt".into()],
            (row, Locator::Css(s)) if row.starts_with("row:") && *s == sel.grid_cells => {
                let Some(grid) = self.grid() else {
                    return Ok(vec![]);
                };
                let r: usize = row["row:".len()..].parse().unwrap_or(0);
                let (label, values) = &grid.rows[r];
                let mut ids = vec![format!("t:{}", label)];
                ids.extend(self.visible(grid).map(|i| format!("t:{}", values[i])));
                ids
            }
            _ => vec![],
        };
        Ok(Self::handles(ids))
    }

    async fn click(&self, el: &ElementHandle) -> Result<()> {
        let mut st = self.state.borrow_mut();
        st.clicks.push(el.id().to_string());
        match el.id() {
            "overlay-close" => st.overlay = None,
            "result" => {
                st.opened = true;
                // an ad without a close button pops up on the entity page
                st.overlay = Some(false);
            }
            "dropdown" => st.dropdown_open = true,
            "quarterly" => {
                st.quarterly = true;
                st.dropdown_open = false;
            }
            id if id.starts_with("tab:") => {
                st.tab = Some(id["tab:".len()..].to_string());
                st.nested = false;
                st.offset = 0;
            }
            id if id.starts_with("nested:") => st.nested = true,
            _ => {}
        }
        Ok(())
    }

    async fn clear(&self, _el: &ElementHandle) -> Result<()> {
        self.state.borrow_mut().typed.clear();
        Ok(())
    }

    async fn send_keys(&self, _el: &ElementHandle, text: &str) -> Result<()> {
        self.state.borrow_mut().typed.push_str(text);
        Ok(())
    }

    async fn is_displayed(&self, _el: &ElementHandle) -> Result<bool> {
        Ok(true)
    }

    async fn attribute(&self, el: &ElementHandle, name: &str) -> Result<Option<String>> {
        if el.id() == "opt" && name == "value" {
            let q = self.state.borrow().quarterly;
            return Ok(Some(if q { "0" } else { "1" }.to_string()));
        }
        Ok(None)
    }

    async fn text(&self, el: &ElementHandle) -> Result<String> {
        if el.id() == "opt" {
            let q = self.state.borrow().quarterly;
            return Ok(if q { "Quarterly" } else { "Annual" }.to_string());
        }
        Ok(el.id().strip_prefix("t:").unwrap_or_default().to_string())
    }

    async fn location(&self, _el: &ElementHandle) -> Result<(f64, f64)> {
        Ok((self.state.borrow().offset as f64 * THUMB_STEP, 0.0))
    }

    async fn drag_by(&self, _el: &ElementHandle, _dx: i64, _dy: i64) -> Result<()> {
        let total = self.grid().map(|g| g.dates.len()).unwrap_or(0);
        let mut st = self.state.borrow_mut();
        if st.offset + WINDOW < total {
            st.offset += 1;
        }
        Ok(())
    }

    async fn execute_script(&self, code: &str, _args: Vec<Value>) -> Result<Value> {
        let mut st = self.state.borrow_mut();
        if code.contains("outerHTML") {
            let html = if st.nested { self.employees_html } else { "" };
            return Ok(Value::String(html.to_string()));
        }
        if code.contains("remove()") {
            st.overlay = None;
        }
        Ok(Value::Null)
    }

    fn element_arg(&self, el: &ElementHandle) -> Value {
        Value::String(el.id().to_string())
    }
}

fn config() -> Config {
    Config {
        timing: Timing::immediate(),
        panels: vec![
            Panel::wide("Financials"),
            Panel::wide("Balance Sheet"),
            Panel::wide("Key Financial Ratios"),
            Panel::employee_count("Other Metrics", "Employee Count"),
        ],
        ..Config::default()
    }
}

fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("finscrape=debug")
        .with_test_writer()
        .try_init();
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date")
}

#[tokio::test]
async fn panels_are_joined_on_date() {
    init_logs();
    let page = FakePage::new();
    let cfg = config();
    let report = PanelOrchestrator::new(&page, &cfg).collect("ACME").await;

    assert_eq!(report.entity, "ACME");
    assert_eq!(report.search_error, None);
    let statuses: Vec<(&str, &PanelStatus)> = report
        .panels
        .iter()
        .map(|p| (p.panel.as_str(), &p.status))
        .collect();
    assert_eq!(
        statuses[0],
        (
            "Financials",
            &PanelStatus::Collected {
                dates: 3,
                columns: 2,
                coerced: 1
            }
        )
    );
    assert_eq!(
        statuses[1],
        (
            "Balance Sheet",
            &PanelStatus::Collected {
                dates: 3,
                columns: 1,
                coerced: 0
            }
        )
    );
    assert_eq!(statuses[2].0, "Key Financial Ratios");
    assert!(matches!(statuses[2].1, PanelStatus::Skipped { .. }));
    assert!(matches!(statuses[3].1, PanelStatus::Collected { .. }));
    assert_eq!(report.collected(), 3);

    let table = report.table.expect("table collected");
    assert_eq!(
        table.columns(),
        &[
            "financials_Revenue".to_string(),
            "financials_EPS".to_string(),
            "balance_sheet_Cash".to_string(),
            EMPLOYEES_COLUMN.to_string(),
        ]
    );
    let dates: Vec<NaiveDate> = table.dates().copied().collect();
    assert_eq!(
        dates,
        vec![d("2023-03-31"), d("2023-06-30"), d("2023-09-30"), d("2023-12-31")]
    );

    // column only rendered after scrolling the grid
    assert_eq!(table.get(d("2023-09-30"), "financials_Revenue"), Some(1200.0));
    assert_eq!(table.get(d("2023-12-31"), "balance_sheet_Cash"), Some(30.0));
    assert_eq!(table.get(d("2023-06-30"), "financials_EPS"), Some(0.0));
    assert_eq!(table.get(d("2023-09-30"), "financials_EPS"), None);
    assert_eq!(table.get(d("2023-03-31"), "balance_sheet_Cash"), None);
    for date in &dates {
        assert_eq!(table.get(*date, EMPLOYEES_COLUMN), Some(1250.0));
    }

    let filled = table.filled_rows();
    assert_eq!(filled[0], (d("2023-03-31"), vec![1000.0, 0.5, 0.0, 1250.0]));
    assert_eq!(filled[3], (d("2023-12-31"), vec![0.0, 0.0, 30.0, 1250.0]));
}

#[tokio::test]
async fn page_interactions_follow_the_panel_order() {
    let page = FakePage::new();
    let cfg = config();
    PanelOrchestrator::new(&page, &cfg).collect("ACME").await;

    let st = page.state.borrow();
    assert_eq!(st.typed, "ACME");
    assert!(st.quarterly);
    assert_eq!(st.overlay, None);
    assert_eq!(
        st.clicks,
        vec![
            "overlay-close",
            "result",
            "tab:Financials",
            "dropdown",
            "quarterly",
            "tab:Balance Sheet",
            "tab:Other Metrics",
            "nested:Employee Count",
        ]
    );
}

#[tokio::test]
async fn missing_search_box_still_collects_loaded_page() {
    let page = FakePage {
        search_available: false,
        ..FakePage::new()
    };
    page.state.borrow_mut().opened = true;
    let cfg = config();
    let report = PanelOrchestrator::new(&page, &cfg).collect("ACME").await;

    assert!(report.search_error.is_some());
    assert_eq!(report.panels.len(), 4);
    assert_eq!(report.collected(), 3);
    let table = report.table.expect("panels collected without a search");
    assert_eq!(table.len(), 4);
    assert_eq!(table.get(d("2023-09-30"), "financials_Revenue"), Some(1200.0));
    assert_eq!(page.state.borrow().typed, "");
}

#[tokio::test]
async fn failed_search_on_blank_page_skips_every_panel() {
    let page = FakePage {
        search_available: false,
        ..FakePage::new()
    };
    let cfg = config();
    let report = PanelOrchestrator::new(&page, &cfg).collect("NOPE").await;

    assert!(report.search_error.is_some());
    assert!(report.table.is_none());
    assert_eq!(report.panels.len(), 4);
    assert!(report
        .panels
        .iter()
        .all(|p| matches!(p.status, PanelStatus::Skipped { .. })));
}

#[tokio::test]
async fn employees_without_dated_rows_are_skipped() {
    let page = FakePage::new();
    let cfg = Config {
        panels: vec![Panel::employee_count("Other Metrics", "Employee Count")],
        ..config()
    };
    let report = PanelOrchestrator::new(&page, &cfg).collect("ACME").await;
    assert!(report.table.is_none());
    assert!(matches!(
        report.panels[0].status,
        PanelStatus::Skipped { .. }
    ));
}

#[tokio::test]
async fn collected_table_is_written_as_csv() -> anyhow::Result<()> {
    let page = FakePage::new();
    let dir = tempfile::tempdir()?;
    let cfg = Config {
        output_dir: dir.path().to_path_buf(),
        ..config()
    };
    let report = PanelOrchestrator::new(&page, &cfg).collect("ACME").await;
    let table = report.table.expect("table collected");

    let path = cfg.output_path("ACME");
    output::write_csv(&table, &path)?;
    let text = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "Date,financials_Revenue,financials_EPS,balance_sheet_Cash,Employees"
    );
    assert_eq!(lines[1], "2023-03-31,1000,0.5,0,1250");
    assert_eq!(lines.len(), 5);
    Ok(())
}

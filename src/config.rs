// src/config.rs

use crate::panel::Panel;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf, time::Duration};
use tracing::info;

pub const CONFIG_ENV: &str = "FINSCRAPE_CONFIG";
pub const WEBDRIVER_URL_ENV: &str = "FINSCRAPE_WEBDRIVER_URL";

/// Top-level configuration. Every field has a default so an empty (or absent)
/// YAML file yields a working setup for macrotrends.net.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub webdriver: WebDriverConfig,
    pub timing: Timing,
    pub grid: GridConfig,
    pub selectors: Selectors,
    pub panels: Vec<Panel>,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webdriver: WebDriverConfig::default(),
            timing: Timing::default(),
            grid: GridConfig::default(),
            selectors: Selectors::default(),
            panels: Panel::default_sequence(),
            output_dir: PathBuf::from("stock"),
        }
    }
}

impl Config {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("parsing config YAML")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in config file {}", path.display()))
    }

    /// Defaults, overlaid by `$FINSCRAPE_CONFIG` when set, then by
    /// `$FINSCRAPE_WEBDRIVER_URL`.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var_os(CONFIG_ENV) {
            Some(path) => {
                info!(path = ?path, "loading config");
                Self::from_file(PathBuf::from(path))?
            }
            None => Self::default(),
        };
        if let Ok(url) = env::var(WEBDRIVER_URL_ENV) {
            cfg.webdriver.url = url;
        }
        Ok(cfg)
    }

    /// Output path for one entity: `<output_dir>/<entity>/<entity>_combined_quarterly.csv`.
    pub fn output_path(&self, entity: &str) -> PathBuf {
        self.output_dir
            .join(entity)
            .join(format!("{}_combined_quarterly.csv", entity))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Endpoint of a running chromedriver/geckodriver.
    pub url: String,
    pub start_url: String,
    pub browser: String,
    pub args: Vec<String>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".into(),
            start_url: "https://www.macrotrends.net".into(),
            browser: "chrome".into(),
            args: vec![
                "user-agent=Mozilla/5.0".into(),
                "--log-level=3".into(),
                "--disable-infobars".into(),
                "--disable-notifications".into(),
                "--disable-extensions".into(),
                "--start-minimized".into(),
                "--window-position=4000,0".into(),
            ],
        }
    }
}

/// Wait budgets and settle delays, all in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub element_timeout_ms: u64,
    pub grid_timeout_ms: u64,
    pub overlay_timeout_ms: u64,
    /// Short pause after closing an overlay or scrolling the page.
    pub settle_ms: u64,
    pub poll_interval_ms: u64,
    pub after_click_ms: u64,
    pub after_scroll_ms: u64,
    pub after_quarterly_ms: u64,
    pub grid_render_ms: u64,
    pub after_search_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            element_timeout_ms: 10_000,
            grid_timeout_ms: 20_000,
            overlay_timeout_ms: 10_000,
            settle_ms: 1_000,
            poll_interval_ms: 250,
            after_click_ms: 3_000,
            after_scroll_ms: 2_000,
            after_quarterly_ms: 5_000,
            grid_render_ms: 5_000,
            after_search_ms: 3_000,
        }
    }
}

impl Timing {
    /// Every wait and delay set to zero; used by tests against in-memory pages.
    pub fn immediate() -> Self {
        Self {
            element_timeout_ms: 0,
            grid_timeout_ms: 0,
            overlay_timeout_ms: 0,
            settle_ms: 0,
            poll_interval_ms: 0,
            after_click_ms: 0,
            after_scroll_ms: 0,
            after_quarterly_ms: 0,
            grid_render_ms: 0,
            after_search_ms: 0,
        }
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
    pub fn grid_timeout(&self) -> Duration {
        Duration::from_millis(self.grid_timeout_ms)
    }
    pub fn overlay_timeout(&self) -> Duration {
        Duration::from_millis(self.overlay_timeout_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn after_click(&self) -> Duration {
        Duration::from_millis(self.after_click_ms)
    }
    pub fn after_scroll(&self) -> Duration {
        Duration::from_millis(self.after_scroll_ms)
    }
    pub fn after_quarterly(&self) -> Duration {
        Duration::from_millis(self.after_quarterly_ms)
    }
    pub fn grid_render(&self) -> Duration {
        Duration::from_millis(self.grid_render_ms)
    }
    pub fn after_search(&self) -> Duration {
        Duration::from_millis(self.after_search_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub max_iterations: usize,
    /// Horizontal drag distance per scroll attempt, in pixels.
    pub scroll_step: i64,
    /// Vertical page scroll applied before waiting for the grid.
    pub page_scroll: i64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            scroll_step: 100,
            page_scroll: 150,
        }
    }
}

/// Page-specific locators. CSS unless the field name says `xpath`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub overlay: String,
    /// Overlays that must be gone before interaction resumes; superset of `overlay`.
    pub overlay_residue: String,
    pub close_button_xpath: String,
    pub close_button: String,
    pub grid: String,
    pub grid_header_cells: String,
    pub grid_rows: String,
    pub grid_cells: String,
    pub scroll_thumb_id: String,
    pub tab_bar: String,
    pub frequency_select: String,
    pub frequency_selected_option: String,
    pub frequency_dropdown: String,
    pub quarterly_option_xpath: String,
    pub employee_table: String,
    pub search_box_placeholders: Vec<String>,
    pub search_result: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            overlay: "div[role='dialog'], div[class*='modal'], div[class*='popup'], div[class*='overlay']".into(),
            overlay_residue: "div[id^='gray'], div[id^='overlay'], div[role='dialog'], div[class*='modal'], div[class*='popup'], div[class*='overlay']".into(),
            close_button_xpath: ".//button[contains(text(), '×') or contains(text(), 'Close') or contains(text(), 'close') or contains(text(), 'CLOSE')]".into(),
            close_button: "button.close, button.btn-close, button[class*='close'], button[class*='dismiss']".into(),
            grid: "#jqxgrid".into(),
            grid_header_cells: "#jqxgrid .jqx-grid-column-header span".into(),
            grid_rows: "#jqxgrid .jqx-grid-content div[role='row']".into(),
            grid_cells: "div[role='gridcell']".into(),
            scroll_thumb_id: "jqxScrollThumbhorizontalScrollBarjqxgrid".into(),
            tab_bar: "ul#myTabs".into(),
            frequency_select: "select.frequency_select".into(),
            frequency_selected_option: "option[selected]".into(),
            frequency_dropdown: "span.select2-selection--single".into(),
            quarterly_option_xpath: "//li[contains(text(),'Quarterly')]".into(),
            employee_table: "table.historical_data_table".into(),
            search_box_placeholders: vec![
                "Search over 200,000 charts...".into(),
                "Search over 200,000 interactive charts...".into(),
            ],
            search_result: ".typeahead__result ul li a".into(),
        }
    }
}

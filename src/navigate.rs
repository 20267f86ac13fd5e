// src/navigate.rs
//! Getting the page into the state the extractors expect: entity loaded,
//! panel tab selected, quarterly view, grid rendered.

use crate::config::{Selectors, Timing};
use crate::driver::{wait_for, wait_for_element, wait_for_visible, ElementHandle, Locator, PageDriver};
use crate::error::{Result, ScrapeError};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

const EMPLOYEE_TABLES_JS: &str = r#"
return Array.from(document.querySelectorAll(arguments[0]))
    .map(function (t) { return t.outerHTML; })
    .join('\n');
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    AlreadyQuarterly,
    SwitchedToQuarterly,
}

pub struct Navigator<'a, D> {
    driver: &'a D,
    selectors: &'a Selectors,
    timing: &'a Timing,
}

impl<'a, D: PageDriver> Navigator<'a, D> {
    pub fn new(driver: &'a D, selectors: &'a Selectors, timing: &'a Timing) -> Self {
        Self {
            driver,
            selectors,
            timing,
        }
    }

    /// Type `entity` into the site search and open the first suggestion.
    pub async fn search(&self, entity: &str) -> Result<()> {
        let search_box = self.search_box().await?;
        self.driver
            .execute_script(
                "arguments[0].scrollIntoView(true);",
                vec![self.driver.element_arg(&search_box)],
            )
            .await?;
        self.pause(self.timing.settle()).await;

        self.driver.clear(&search_box).await?;
        self.driver.send_keys(&search_box, entity).await?;
        debug!(entity, "typed search");

        let first = wait_for_visible(
            self.driver,
            &Locator::css(&self.selectors.search_result),
            self.timing.element_timeout(),
            self.timing.poll_interval(),
        )
        .await?;
        self.driver.click(&first).await?;
        info!(entity, "opened first search result");
        self.pause(self.timing.after_search()).await;
        Ok(())
    }

    /// The search input differs between the home page and inner pages; take
    /// whichever placeholder variant shows up.
    async fn search_box(&self) -> Result<ElementHandle> {
        let mut last = ScrapeError::ElementNotFound("search box".into());
        for placeholder in &self.selectors.search_box_placeholders {
            let locator = Locator::xpath(format!(
                "//input[@class='js-typeahead' and @placeholder={}]",
                xpath_literal(placeholder)
            ));
            match self.wait(&locator).await {
                Ok(el) => return Ok(el),
                Err(e) => {
                    debug!(placeholder = %placeholder, "search box variant not present");
                    last = e;
                }
            }
        }
        Err(last)
    }

    /// Click the top-level tab whose text contains `name`.
    pub async fn select_tab(&self, name: &str) -> Result<()> {
        let bars = &Locator::css(&self.selectors.tab_bar);
        let anchor = &tab_anchor(name);
        let tab = wait_for(
            &format!("tab `{}`", name),
            self.timing.element_timeout(),
            self.timing.poll_interval(),
            || async move {
                for bar in self.driver.find_all(bars).await? {
                    if let Some(a) = self.driver.find_all_in(&bar, anchor).await?.into_iter().next() {
                        return Ok(Some(a));
                    }
                }
                Ok(None)
            },
        )
        .await?;
        self.driver.click(&tab).await?;
        info!(tab = name, "selected tab");
        self.pause(self.timing.after_click()).await;
        Ok(())
    }

    /// Click a tab inside the second tab bar (the one nested under the
    /// current panel).
    pub async fn select_nested_tab(&self, name: &str) -> Result<()> {
        let bars = &Locator::css(&self.selectors.tab_bar);
        let nested = wait_for(
            "nested tab bar",
            self.timing.element_timeout(),
            self.timing.poll_interval(),
            || async move { Ok(self.driver.find_all(bars).await?.into_iter().nth(1)) },
        )
        .await
        .map_err(|_| ScrapeError::ElementNotFound("nested tab bar".into()))?;

        let tab = self.driver.find_in(&nested, &tab_anchor(name)).await?;
        self.driver.click(&tab).await?;
        info!(tab = name, "selected nested tab");
        self.pause(self.timing.after_click()).await;
        Ok(())
    }

    /// Switch the frequency selector to quarterly unless it already is.
    pub async fn ensure_quarterly(&self) -> Result<Frequency> {
        let select = self
            .wait(&Locator::css(&self.selectors.frequency_select))
            .await?;
        let selected = self
            .driver
            .find_all_in(&select, &Locator::css(&self.selectors.frequency_selected_option))
            .await?
            .into_iter()
            .next();

        if let Some(option) = selected {
            let text = self.driver.text(&option).await?.trim().to_string();
            let value = self.driver.attribute(&option, "value").await?;
            debug!(text = %text, value = ?value, "current frequency");
            if value.as_deref() == Some("0") || text.contains("Quarterly") {
                return Ok(Frequency::AlreadyQuarterly);
            }
        }

        let dropdown = wait_for_visible(
            self.driver,
            &Locator::css(&self.selectors.frequency_dropdown),
            self.timing.element_timeout(),
            self.timing.poll_interval(),
        )
        .await?;
        self.driver.click(&dropdown).await?;

        let quarterly = wait_for_visible(
            self.driver,
            &Locator::xpath(&self.selectors.quarterly_option_xpath),
            self.timing.element_timeout(),
            self.timing.poll_interval(),
        )
        .await?;
        self.driver.click(&quarterly).await?;
        info!("switched to quarterly");
        self.pause(self.timing.after_quarterly()).await;
        Ok(Frequency::SwitchedToQuarterly)
    }

    /// Scroll the grid into view and wait for it to render.
    pub async fn reveal_grid(&self, page_scroll: i64) -> Result<()> {
        self.driver
            .execute_script("window.scrollBy(0, arguments[0]);", vec![json!(page_scroll)])
            .await?;
        self.pause(self.timing.settle()).await;
        wait_for_element(
            self.driver,
            &Locator::css(&self.selectors.grid),
            self.timing.grid_timeout(),
            self.timing.poll_interval(),
        )
        .await?;
        self.pause(self.timing.grid_render()).await;
        Ok(())
    }

    /// Outer HTML of every employee table on the page, concatenated.
    pub async fn employee_table_html(&self) -> Result<String> {
        let v = self
            .driver
            .execute_script(
                EMPLOYEE_TABLES_JS,
                vec![Value::String(self.selectors.employee_table.clone())],
            )
            .await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn wait(&self, locator: &Locator) -> Result<ElementHandle> {
        wait_for_element(
            self.driver,
            locator,
            self.timing.element_timeout(),
            self.timing.poll_interval(),
        )
        .await
    }

    async fn pause(&self, d: Duration) {
        if !d.is_zero() {
            sleep(d).await;
        }
    }
}

fn tab_anchor(name: &str) -> Locator {
    Locator::xpath(format!(".//a[contains(text(), {})]", xpath_literal(name)))
}

/// Quote `s` as an XPath string literal, whatever quotes it contains.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

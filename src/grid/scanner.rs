// src/grid/scanner.rs

use super::types::GridSnapshot;
use crate::driver::{Locator, PageDriver};
use crate::error::Result;
use tracing::trace;

/// Reads whatever window of the grid is currently rendered.
#[allow(async_fn_in_trait)]
pub trait GridScanner {
    async fn scan(&self) -> Result<GridSnapshot>;
}

/// Reads header and cell text straight from the DOM, in document order.
pub struct DomGridScanner<'a, D> {
    driver: &'a D,
    headers: Locator,
    rows: Locator,
    cells: Locator,
}

impl<'a, D: PageDriver> DomGridScanner<'a, D> {
    /// `cells` is resolved relative to each row element.
    pub fn new(driver: &'a D, headers: Locator, rows: Locator, cells: Locator) -> Self {
        Self {
            driver,
            headers,
            rows,
            cells,
        }
    }
}

impl<D: PageDriver> GridScanner for DomGridScanner<'_, D> {
    async fn scan(&self) -> Result<GridSnapshot> {
        let mut headers = Vec::new();
        for el in self.driver.find_all(&self.headers).await? {
            headers.push(self.driver.text(&el).await?.trim().to_string());
        }

        let mut rows = Vec::new();
        for row_el in self.driver.find_all(&self.rows).await? {
            let mut row = Vec::new();
            for cell in self.driver.find_all_in(&row_el, &self.cells).await? {
                row.push(self.driver.text(&cell).await?.trim().to_string());
            }
            rows.push(row);
        }

        trace!(headers = headers.len(), rows = rows.len(), "grid scanned");
        Ok(GridSnapshot::new(headers, rows))
    }
}

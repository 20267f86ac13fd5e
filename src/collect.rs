// src/collect.rs
//! Panel orchestration: walk every configured panel of an entity's page,
//! extract its table and fold everything into one date-indexed table.

use crate::config::Config;
use crate::driver::{Locator, PageDriver};
use crate::error::Result;
use crate::grid::{assemble, AssemblyOptions, DomGridScanner, ThumbScrollDriver};
use crate::navigate::Navigator;
use crate::panel::{parse_employee_tables, Panel, PanelKind, UnifiedTable};
use crate::stabilize::PageStabilizer;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    Collected {
        dates: usize,
        columns: usize,
        /// Cells that were not numeric and were zero-filled.
        coerced: usize,
    },
    /// The panel rendered no rows.
    Empty,
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOutcome {
    pub panel: String,
    pub status: PanelStatus,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub entity: String,
    /// Why the entity search failed, if it did. Panels are still attempted
    /// against whatever page is loaded.
    pub search_error: Option<String>,
    /// `None` when no panel produced any dated rows.
    pub table: Option<UnifiedTable>,
    pub panels: Vec<PanelOutcome>,
}

impl CollectionReport {
    pub fn collected(&self) -> usize {
        self.panels
            .iter()
            .filter(|p| matches!(p.status, PanelStatus::Collected { .. }))
            .count()
    }
}

pub struct PanelOrchestrator<'a, D> {
    driver: &'a D,
    config: &'a Config,
}

impl<'a, D: PageDriver> PanelOrchestrator<'a, D> {
    pub fn new(driver: &'a D, config: &'a Config) -> Self {
        Self { driver, config }
    }

    fn navigator(&self) -> Navigator<'a, D> {
        Navigator::new(self.driver, &self.config.selectors, &self.config.timing)
    }

    fn stabilizer(&self) -> PageStabilizer<'a, D> {
        PageStabilizer::new(self.driver, &self.config.selectors, &self.config.timing)
    }

    /// Search for `entity`, then collect every panel in order. A failed search
    /// or a failed panel is logged and recorded; the remaining panels still run.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn collect(&self, entity: &str) -> CollectionReport {
        let mut report = CollectionReport {
            entity: entity.to_string(),
            ..Default::default()
        };

        self.stabilizer()
            .clear(self.config.timing.overlay_timeout())
            .await;
        if let Err(e) = self.navigator().search(entity).await {
            warn!(error = %e, "search failed; continuing with the loaded page");
            report.search_error = Some(e.to_string());
        }

        let mut unified: Option<UnifiedTable> = None;
        for panel in &self.config.panels {
            let status = match &panel.kind {
                PanelKind::Wide => self.collect_wide(panel, &mut unified).await,
                PanelKind::EmployeeCount { nested_tab } => {
                    self.collect_employees(panel, nested_tab, &mut unified).await
                }
            };
            let status = status.unwrap_or_else(|e| {
                if e.is_missing_control() {
                    warn!(panel = %panel.name, error = %e, "panel controls not found; skipped");
                } else {
                    warn!(panel = %panel.name, error = %e, "panel failed; skipped");
                }
                PanelStatus::Skipped {
                    reason: e.to_string(),
                }
            });
            report.panels.push(PanelOutcome {
                panel: panel.name.clone(),
                status,
            });
        }

        report.table = unified.filter(|t| !t.is_empty());
        match &report.table {
            Some(t) => info!(
                dates = t.len(),
                columns = t.columns().len(),
                panels = report.collected(),
                "collection finished"
            ),
            None => warn!("no data collected"),
        }
        report
    }

    async fn collect_wide(
        &self,
        panel: &Panel,
        unified: &mut Option<UnifiedTable>,
    ) -> Result<PanelStatus> {
        let cfg = self.config;
        let nav = self.navigator();
        let stab = self.stabilizer();
        let overlay_timeout = cfg.timing.overlay_timeout();

        stab.clear(overlay_timeout).await;
        nav.select_tab(&panel.name).await?;
        stab.clear(overlay_timeout).await;
        nav.ensure_quarterly().await?;
        nav.reveal_grid(cfg.grid.page_scroll).await?;

        let sel = &cfg.selectors;
        let scanner = DomGridScanner::new(
            self.driver,
            Locator::css(&sel.grid_header_cells),
            Locator::css(&sel.grid_rows),
            Locator::css(&sel.grid_cells),
        );
        let scroller = ThumbScrollDriver::new(self.driver, Locator::id(&sel.scroll_thumb_id));
        let opts = AssemblyOptions {
            max_iterations: cfg.grid.max_iterations,
            step: cfg.grid.scroll_step,
            settle: cfg.timing.after_scroll(),
        };
        let assembly = assemble(&scanner, &scroller, &opts).await?;
        if assembly.table.is_empty() {
            info!(panel = %panel.name, "grid is empty");
            return Ok(PanelStatus::Empty);
        }

        let (headers, rows) = assembly.table.into_parts();
        let (table, stats) = UnifiedTable::from_wide(&panel.slug(), &headers, &rows);
        if stats.coerced > 0 {
            warn!(panel = %panel.name, coerced = stats.coerced, "non-numeric cells zero-filled");
        }
        if table.is_empty() {
            return Ok(PanelStatus::Empty);
        }

        let status = PanelStatus::Collected {
            dates: table.len(),
            columns: table.columns().len(),
            coerced: stats.coerced,
        };
        *unified = Some(match unified.take() {
            Some(acc) => acc.outer_join(table),
            None => table,
        });
        info!(panel = %panel.name, status = ?status, "panel collected");
        Ok(status)
    }

    async fn collect_employees(
        &self,
        panel: &Panel,
        nested_tab: &str,
        unified: &mut Option<UnifiedTable>,
    ) -> Result<PanelStatus> {
        let nav = self.navigator();
        let stab = self.stabilizer();
        let overlay_timeout = self.config.timing.overlay_timeout();

        stab.clear(overlay_timeout).await;
        nav.select_tab(&panel.name).await?;
        stab.clear(overlay_timeout).await;
        nav.select_nested_tab(nested_tab).await?;

        let employees = parse_employee_tables(&nav.employee_table_html().await?);
        if employees.is_empty() {
            warn!(panel = %panel.name, "employee table is empty");
            return Ok(PanelStatus::Empty);
        }

        match unified.take() {
            Some(acc) if !acc.is_empty() => {
                let dates = acc.len();
                *unified = Some(acc.merge_employees(&employees));
                info!(panel = %panel.name, years = employees.len(), "employee counts merged");
                Ok(PanelStatus::Collected {
                    dates,
                    columns: 1,
                    coerced: 0,
                })
            }
            other => {
                *unified = other;
                warn!(panel = %panel.name, "no dated rows to attach employee counts to");
                Ok(PanelStatus::Skipped {
                    reason: "no dated rows to merge into".into(),
                })
            }
        }
    }
}

// src/grid/assemble.rs

use super::scanner::GridScanner;
use super::scroll::ScrollDriver;
use super::types::{AssembledTable, GridSnapshot};
use crate::error::Result;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Why the scan/scroll loop ended. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No scrollbar before a scroll attempt.
    NoScrollbar,
    /// Thumb vanished or did not move forward after a drag.
    Stalled,
    /// Thumb moved but no unseen date column was rendered.
    Exhausted,
    /// `max_iterations` scroll attempts were spent.
    IterationLimit,
}

#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub max_iterations: usize,
    pub step: i64,
    /// Pause after each drag so the grid can re-render.
    pub settle: Duration,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            step: 100,
            settle: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub table: AssembledTable,
    pub stop: StopReason,
    /// Scroll attempts made.
    pub scrolls: usize,
}

/// One diff step: the unseen date columns in `snapshot` and the table with
/// them appended.
pub fn fold_snapshot(table: AssembledTable, snapshot: &GridSnapshot) -> (Vec<String>, AssembledTable) {
    let new_cols = table.unseen_dates(snapshot);
    let table = table.with_columns(snapshot, &new_cols);
    (new_cols, table)
}

/// Scan, then scroll/scan/diff until the grid stops yielding new date columns.
///
/// At most `max_iterations` scroll attempts are made whatever the scanner and
/// scroller report.
#[tracing::instrument(level = "debug", skip_all, fields(max_iterations = opts.max_iterations))]
pub async fn assemble<S, R>(scanner: &S, scroller: &R, opts: &AssemblyOptions) -> Result<Assembly>
where
    S: GridScanner,
    R: ScrollDriver,
{
    let mut table = AssembledTable::seed(scanner.scan().await?);
    let mut scrolls = 0;
    let mut stop = StopReason::IterationLimit;

    while scrolls < opts.max_iterations {
        let Some(before) = scroller.position().await else {
            stop = StopReason::NoScrollbar;
            break;
        };

        scrolls += 1;
        if !scroller.advance(opts.step).await {
            debug!(attempt = scrolls, "drag reported an error; checking position anyway");
        }
        if !opts.settle.is_zero() {
            sleep(opts.settle).await;
        }

        match scroller.position().await {
            Some(after) if after > before => {
                debug!(before, after, "thumb moved");
            }
            _ => {
                stop = StopReason::Stalled;
                break;
            }
        }

        let snapshot = scanner.scan().await?;
        let (new_cols, next) = fold_snapshot(table, &snapshot);
        table = next;
        if new_cols.is_empty() {
            stop = StopReason::Exhausted;
            break;
        }
        debug!(added = new_cols.len(), total = table.headers().len(), "new date columns");
    }

    let table = table.normalized();
    info!(
        columns = table.headers().len(),
        rows = table.rows().len(),
        scrolls,
        stop = ?stop,
        "grid assembled"
    );
    Ok(Assembly {
        table,
        stop,
        scrolls,
    })
}

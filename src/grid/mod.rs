// src/grid/mod.rs
//! Reconstructing a full wide table from a horizontally virtualized grid.

pub mod assemble;
pub mod scanner;
pub mod scroll;
pub mod types;

pub use assemble::{assemble, fold_snapshot, Assembly, AssemblyOptions, StopReason};
pub use scanner::{DomGridScanner, GridScanner};
pub use scroll::{ScrollDriver, ThumbScrollDriver};
pub use types::{is_date_like, AssembledTable, GridSnapshot};

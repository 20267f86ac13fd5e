pub mod collect;
pub mod config;
pub mod driver;
pub mod error;
pub mod grid;
pub mod navigate;
pub mod output;
pub mod panel;
pub mod stabilize;

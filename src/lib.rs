//! `covidjoin`: align, merge and clean the OWID COVID outcomes dataset and
//! the OxCGRT government-response tracker into one table.

pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod process;
pub mod schema;
pub mod summary;
pub mod table;

pub use config::Config;
pub use error::PipelineError;
pub use table::{Cell, Table};

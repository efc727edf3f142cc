// src/error.rs
use thiserror::Error;

/// Fatal conditions raised by the reconciliation pipeline.
///
/// Every variant aborts the run; informational conditions (one-sided
/// countries, row drops) are logged instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unparseable date {value:?} in table `{table}` at row {row}")]
    UnparseableDate {
        table: String,
        row: usize,
        value: String,
    },

    #[error("{stage} produced an empty result: {detail}")]
    EmptyIntersection { stage: &'static str, detail: String },

    #[error("unrecognized value {value:?} in column `{column}` at row {row}")]
    UnrecognizedRecodeValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("{stage}: expected {expected} rows after join, got {actual}")]
    JoinCardinality {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("table `{table}` has more than one row for key ({key})")]
    DuplicateKey { table: String, key: String },

    #[error("column `{column}` not found in table `{table}`")]
    MissingColumn { table: String, column: String },

    #[error("column `{column}` already exists in table `{table}`")]
    DuplicateColumn { table: String, column: String },

    #[error("invalid pipeline option `{option}`: {detail}")]
    InvalidOption { option: &'static str, detail: String },

    #[error("schema drift in {stage}: expected column `{column}` is absent")]
    SchemaDrift { stage: &'static str, column: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

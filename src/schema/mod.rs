pub mod arrow;
pub mod write;

pub use self::arrow::{infer_arrow_schema, infer_column_type, to_record_batch};
pub use self::write::write_parquet;

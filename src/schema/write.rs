// src/schema/write.rs
use anyhow::{Context, Result};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    path::Path,
};
use tracing::info;

use super::arrow::to_record_batch;
use crate::table::Table;

/// Write `table` as a single-batch Parquet file.
///
/// Writes atomically: to `<path>.tmp`, then renames over the target.
pub fn write_parquet<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let batch = to_record_batch(table)?;

    let tmp = path.with_extension("parquet.tmp");
    let file = File::create(&tmp).with_context(|| format!("creating {:?}", tmp))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing Parquet writer")?;

    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    info!(path = %path.display(), rows = table.len(), "wrote parquet");
    Ok(())
}

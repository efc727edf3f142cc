// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, StringArray},
    datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::table::{Cell, Table};

/// Infer the Arrow type of one column from its cells.
///
/// - every present cell a number → Float64
/// - every present cell a date   → Date32
/// - nothing present             → Float64 (an all-null numeric column)
/// - anything else               → Utf8
pub fn infer_column_type<'a, I>(cells: I) -> DataType
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut numbers = 0usize;
    let mut dates = 0usize;
    let mut other = 0usize;
    for cell in cells {
        match cell {
            Cell::Missing => {}
            Cell::Number(_) => numbers += 1,
            Cell::Date(_) => dates += 1,
            Cell::Text(_) => other += 1,
        }
    }
    match (numbers, dates, other) {
        (_, 0, 0) => DataType::Float64,
        (0, _, 0) => DataType::Date32,
        _ => DataType::Utf8,
    }
}

/// Build an ArrowSchema (inside an Arc) describing every column of `table`.
pub fn infer_arrow_schema(table: &Table) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let dt = infer_column_type(table.rows.iter().map(|r| &r[i]));
            ArrowField::new(name, dt, /* nullable = */ true)
        })
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

fn days_since_epoch(d: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    d.signed_duration_since(epoch).num_days() as i32
}

/// Convert `table` into a single RecordBatch using the inferred schema.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let schema = infer_arrow_schema(table);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.width());

    for (i, field) in schema.fields().iter().enumerate() {
        let cells = table.rows.iter().map(|r| &r[i]);
        let array: ArrayRef = match field.data_type() {
            DataType::Float64 => Arc::new(cells.map(Cell::as_f64).collect::<Float64Array>()),
            DataType::Date32 => Arc::new(
                cells
                    .map(|c| c.as_date().map(days_since_epoch))
                    .collect::<Date32Array>(),
            ),
            _ => Arc::new(
                cells
                    .map(|c| c.key())
                    .collect::<StringArray>(),
            ),
        };
        columns.push(array);
    }

    RecordBatch::try_new(schema, columns)
        .with_context(|| format!("building record batch for {}", table.name))
}

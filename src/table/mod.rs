// src/table/mod.rs
use std::collections::HashSet;

use crate::error::{PipelineError, Result};

pub mod cell;
pub mod csv_io;
pub mod join;

pub use cell::Cell;
pub use join::{join, JoinKind};

/// An in-memory, row-major table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Label used in logs and error messages (e.g. "owid").
    pub name: String,
    /// Column names, unique within the table.
    pub headers: Vec<String>,
    /// Each row holds exactly `headers.len()` cells.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from literal headers and rows; used heavily by tests.
    pub fn from_rows(name: impl Into<String>, headers: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Borrow every cell of one column, in row order.
    pub fn column(&self, column: &str) -> Result<Vec<&Cell>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn lowercase_headers(&mut self) {
        for h in self.headers.iter_mut() {
            *h = h.to_lowercase();
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from != to && self.has_column(to) {
            return Err(PipelineError::DuplicateColumn {
                table: self.name.clone(),
                column: to.to_string(),
            });
        }
        let idx = self.column_index(from)?;
        self.headers[idx] = to.to_string();
        Ok(())
    }

    pub fn drop_columns(&mut self, columns: &[&str]) -> Result<()> {
        let mut drop = HashSet::new();
        for c in columns {
            drop.insert(self.column_index(c)?);
        }
        let keep: Vec<usize> = (0..self.width()).filter(|i| !drop.contains(i)).collect();
        self.headers = keep.iter().map(|&i| self.headers[i].clone()).collect();
        for row in self.rows.iter_mut() {
            let old = std::mem::take(row);
            *row = old
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !drop.contains(i))
                .map(|(_, c)| c)
                .collect();
        }
        Ok(())
    }

    /// Replace the values of an existing column, or append it at the end.
    pub fn upsert_column(&mut self, column: &str, values: Vec<Cell>) {
        assert_eq!(values.len(), self.len(), "column length must match row count");
        match self.headers.iter().position(|h| h == column) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.headers.push(column.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
    }

    /// Keep only rows whose mask entry is true; returns the number dropped.
    pub fn retain_mask(&mut self, mask: &[bool]) -> usize {
        assert_eq!(mask.len(), self.len(), "mask length must match row count");
        let before = self.len();
        let mut keep = mask.iter();
        self.rows.retain(|_| *keep.next().unwrap_or(&false));
        before - self.len()
    }

    /// Distinct non-missing keys of a column, in first-seen order.
    pub fn distinct(&self, column: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for cell in self.column(column)? {
            if let Some(k) = cell.key() {
                if seen.insert(k.clone()) {
                    out.push(k);
                }
            }
        }
        Ok(out)
    }

    /// Project onto the named columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Table> {
        let idx = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table {
            name: self.name.clone(),
            headers: columns.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| idx.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    /// Fail with `DuplicateKey` if any (key columns) tuple occurs twice.
    pub fn ensure_unique(&self, columns: &[&str]) -> Result<()> {
        let idx = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        let mut seen = HashSet::with_capacity(self.len());
        for row in &self.rows {
            let key: Vec<String> = idx.iter().map(|&i| row[i].render()).collect();
            if !seen.insert(key.clone()) {
                return Err(PipelineError::DuplicateKey {
                    table: self.name.clone(),
                    key: key.join(", "),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            "t",
            &["A", "b", "c"],
            vec![
                vec![Cell::from("x"), Cell::Number(1.0), Cell::Missing],
                vec![Cell::from("y"), Cell::Number(2.0), Cell::from("k")],
                vec![Cell::from("x"), Cell::Number(3.0), Cell::Missing],
            ],
        )
    }

    #[test]
    fn drop_and_rename() {
        let mut t = sample();
        t.lowercase_headers();
        t.drop_columns(&["b"]).unwrap();
        assert_eq!(t.headers, vec!["a", "c"]);
        assert_eq!(t.rows[1], vec![Cell::from("y"), Cell::from("k")]);

        t.rename_column("c", "d").unwrap();
        assert!(t.has_column("d"));
        assert!(matches!(
            t.rename_column("a", "d"),
            Err(PipelineError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            t.drop_columns(&["zzz"]),
            Err(PipelineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let t = sample();
        assert_eq!(t.distinct("A").unwrap(), vec!["x", "y"]);
        assert_eq!(t.distinct("c").unwrap(), vec!["k"]);
    }

    #[test]
    fn retain_mask_reports_drops() {
        let mut t = sample();
        let dropped = t.retain_mask(&[true, false, true]);
        assert_eq!(dropped, 1);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn ensure_unique_detects_duplicates() {
        let t = sample();
        assert!(t.ensure_unique(&["A", "b"]).is_ok());
        let err = t.ensure_unique(&["A"]).unwrap_err();
        assert!(err.to_string().contains("x"));
    }

    #[test]
    fn upsert_replaces_or_appends() {
        let mut t = sample();
        t.upsert_column("b", vec![Cell::Missing; 3]);
        assert_eq!(t.width(), 3);
        assert!(t.column("b").unwrap().iter().all(|c| c.is_missing()));
        t.upsert_column("z", vec![Cell::Number(0.0); 3]);
        assert_eq!(t.headers.last().map(String::as_str), Some("z"));
    }
}

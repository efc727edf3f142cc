// src/table/join.rs
use std::collections::{HashMap, HashSet};

use super::{Cell, Table};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Every left row survives; unmatched rows get missing right columns.
    Left,
    /// Only rows with a match on both sides survive.
    Inner,
}

/// Hash join on `(left_col, right_col)` key pairs.
///
/// Output columns are the left columns followed by the right columns.
/// A right key column whose name equals its left partner is emitted once;
/// differently named right keys are kept. Any other name present on both
/// sides is suffixed `_x` (left) / `_y` (right). Row order follows the left
/// table, then the right table for multiple matches. Missing key cells never
/// match.
pub fn join(left: &Table, right: &Table, on: &[(&str, &str)], kind: JoinKind) -> Result<Table> {
    let left_keys = on
        .iter()
        .map(|(l, _)| left.column_index(l))
        .collect::<Result<Vec<_>>>()?;
    let right_keys = on
        .iter()
        .map(|(_, r)| right.column_index(r))
        .collect::<Result<Vec<_>>>()?;

    // right columns that collapse into their left key partner
    let merged_right: HashSet<usize> = on
        .iter()
        .zip(&right_keys)
        .filter(|((l, r), _)| l == r)
        .map(|(_, &i)| i)
        .collect();
    let right_cols: Vec<usize> = (0..right.width())
        .filter(|i| !merged_right.contains(i))
        .collect();

    let left_names: HashSet<&str> = left.headers.iter().map(String::as_str).collect();
    let right_names: HashSet<&str> = right_cols
        .iter()
        .map(|&i| right.headers[i].as_str())
        .collect();
    let shared_keys: HashSet<&str> = on.iter().filter(|(l, r)| l == r).map(|(l, _)| *l).collect();

    let mut headers = Vec::with_capacity(left.width() + right_cols.len());
    for h in &left.headers {
        if right_names.contains(h.as_str()) && !shared_keys.contains(h.as_str()) {
            headers.push(format!("{h}_x"));
        } else {
            headers.push(h.clone());
        }
    }
    for &i in &right_cols {
        let h = &right.headers[i];
        if left_names.contains(h.as_str()) {
            headers.push(format!("{h}_y"));
        } else {
            headers.push(h.clone());
        }
    }

    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (ri, row) in right.rows.iter().enumerate() {
        if let Some(key) = row_key(row, &right_keys) {
            index.entry(key).or_default().push(ri);
        }
    }

    let mut rows = Vec::with_capacity(left.len());
    for row in &left.rows {
        let matches = row_key(row, &left_keys).and_then(|k| index.get(&k));
        match matches {
            Some(hits) => {
                for &ri in hits {
                    let mut out = row.clone();
                    out.extend(right_cols.iter().map(|&i| right.rows[ri][i].clone()));
                    rows.push(out);
                }
            }
            None if kind == JoinKind::Left => {
                let mut out = row.clone();
                out.extend(std::iter::repeat(Cell::Missing).take(right_cols.len()));
                rows.push(out);
            }
            None => {}
        }
    }

    Ok(Table {
        name: left.name.clone(),
        headers,
        rows,
    })
}

fn row_key(row: &[Cell], idx: &[usize]) -> Option<Vec<String>> {
    idx.iter().map(|&i| row[i].key()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Table {
        Table::from_rows(
            "policy",
            &["countryname", "date", "iso_code"],
            vec![
                vec!["A".into(), "d1".into(), "AAA".into()],
                vec!["A".into(), "d2".into(), "AAA".into()],
                vec!["B".into(), "d1".into(), "BBB".into()],
            ],
        )
    }

    fn outcomes() -> Table {
        Table::from_rows(
            "outcomes",
            &["location", "date", "iso_code", "cases"],
            vec![
                vec!["A".into(), "d1".into(), "OWA".into(), Cell::Number(5.0)],
                vec!["B".into(), "d1".into(), "OWB".into(), Cell::Number(7.0)],
            ],
        )
    }

    #[test]
    fn left_join_keeps_unmatched_rows_and_suffixes_collisions() {
        let out = join(
            &policy(),
            &outcomes(),
            &[("countryname", "location"), ("date", "date")],
            JoinKind::Left,
        )
        .unwrap();
        assert_eq!(
            out.headers,
            vec!["countryname", "date", "iso_code_x", "location", "iso_code_y", "cases"]
        );
        assert_eq!(out.len(), 3);
        assert_eq!(out.rows[1][3], Cell::Missing);
        assert_eq!(out.rows[1][5], Cell::Missing);
        assert_eq!(out.rows[2][5], Cell::Number(7.0));
    }

    #[test]
    fn inner_join_drops_unmatched_rows() {
        let out = join(
            &policy(),
            &outcomes(),
            &[("countryname", "location"), ("date", "date")],
            JoinKind::Inner,
        )
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn duplicate_right_keys_multiply_rows() {
        let mut right = outcomes();
        right.rows.push(right.rows[0].clone());
        let out = join(
            &policy(),
            &right,
            &[("countryname", "location"), ("date", "date")],
            JoinKind::Left,
        )
        .unwrap();
        assert_eq!(out.len(), 4);
    }
}

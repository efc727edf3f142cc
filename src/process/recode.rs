// src/process/recode.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::table::{Cell, Table};

/// Suffix shared by every composite policy-indicator column.
pub const COMBINED_SUFFIX: &str = "_combined";

/// Composite columns published without a national/local flag.
pub const UNFLAGGED_COLUMNS: [&str; 4] = ["e2_combined", "h2_combined", "h3_combined", "c8_combined"];

pub const MISSING_SENTINEL: &str = "(missing)";

static FLAGGED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(G|T|-National|-Local)$").expect("valid regex"));
static INCOME_LEGACY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([AF])$").expect("valid regex"));

/// Parsed shape of one composite policy-indicator value.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeCode {
    Missing,
    /// Empty text.
    Empty,
    /// The literal "(missing)" placeholder.
    MissingSentinel,
    Zero,
    /// A bare number without a flag.
    Numeric(f64),
    /// Applies to the whole country ("2G" / "2-National").
    National(String),
    /// Applies to part of the country ("2T" / "2-Local").
    Local(String),
    Invalid(String),
}

impl CompositeCode {
    pub fn parse(cell: &Cell) -> Self {
        match cell {
            Cell::Missing => CompositeCode::Missing,
            Cell::Number(v) if *v == 0.0 => CompositeCode::Zero,
            Cell::Number(v) => CompositeCode::Numeric(*v),
            Cell::Date(_) => CompositeCode::Invalid(cell.render()),
            Cell::Text(s) => match s.as_str() {
                "" => CompositeCode::Empty,
                "0" => CompositeCode::Zero,
                MISSING_SENTINEL => CompositeCode::MissingSentinel,
                _ if s.bytes().all(|b| b.is_ascii_digit()) => match s.parse::<f64>() {
                    Ok(v) => CompositeCode::Numeric(v),
                    Err(_) => CompositeCode::Invalid(s.clone()),
                },
                _ => match FLAGGED.captures(s) {
                    Some(caps) => {
                        let level = caps[1].to_string();
                        match &caps[2] {
                            "G" | "-National" => CompositeCode::National(level),
                            _ => CompositeCode::Local(level),
                        }
                    }
                    None => CompositeCode::Invalid(s.clone()),
                },
            },
        }
    }

    /// Ordinal label: "G" becomes "-National" and "T" becomes "-Local" so
    /// that sorting labels alphabetically agrees with severity ("3-Local"
    /// after "2-National", like 2.5 after 2.0).
    pub fn to_label(&self) -> Option<Cell> {
        Some(match self {
            CompositeCode::Missing => Cell::Missing,
            CompositeCode::Empty => Cell::text(""),
            CompositeCode::MissingSentinel => Cell::text(MISSING_SENTINEL),
            CompositeCode::Zero => Cell::text("0"),
            CompositeCode::Numeric(v) => Cell::Text(format!("{}", v.round() as i64)),
            CompositeCode::National(level) => Cell::Text(format!("{level}-National")),
            CompositeCode::Local(level) => Cell::Text(format!("{level}-Local")),
            CompositeCode::Invalid(_) => return None,
        })
    }
}

fn unrecognized(column: &str, row: usize, cell: &Cell) -> PipelineError {
    PipelineError::UnrecognizedRecodeValue {
        column: column.to_string(),
        row,
        value: cell.render(),
    }
}

/// Attach a national flag to a bare indicator level: 0 stays "0", any other
/// number `n` becomes "nG". Already-flagged text is left alone.
fn add_national_flag(column: &str, row: usize, cell: &Cell) -> Result<Cell> {
    match CompositeCode::parse(cell) {
        CompositeCode::Missing => Ok(Cell::Missing),
        CompositeCode::Zero => Ok(Cell::text("0")),
        CompositeCode::Numeric(v) => Ok(Cell::Text(format!("{}G", v.trunc() as i64))),
        CompositeCode::Invalid(_) => Err(unrecognized(column, row, cell)),
        _ => Ok(cell.clone()),
    }
}

fn map_column<F>(table: &mut Table, column: &str, mut f: F) -> Result<()>
where
    F: FnMut(usize, &Cell) -> Result<Option<Cell>>,
{
    let idx = table.column_index(column).map_err(|_| PipelineError::SchemaDrift {
        stage: "recode",
        column: column.to_string(),
    })?;
    for (row_no, row) in table.rows.iter_mut().enumerate() {
        if let Some(new) = f(row_no, &row[idx])? {
            row[idx] = new;
        }
    }
    Ok(())
}

/// Flag normalization plus the special-value remaps for vaccination policy
/// (`h7`) and income support (`e1`).
///
/// Each unflagged column gets a `_numeric` companion holding its value
/// before recoding.
#[tracing::instrument(level = "info", skip_all)]
pub fn recode_policy_flags(table: &mut Table) -> Result<()> {
    for column in UNFLAGGED_COLUMNS {
        let before = table
            .column(column)
            .map_err(|_| PipelineError::SchemaDrift {
                stage: "recode",
                column: column.to_string(),
            })?
            .into_iter()
            .cloned()
            .collect();
        table.upsert_column(&format!("{column}_numeric"), before);
        map_column(table, column, |row, cell| {
            add_national_flag(column, row, cell).map(Some)
        })?;
    }

    // "1I" marks a vaccination policy that is national in scope.
    map_column(table, "h7_combined", |_, cell| {
        Ok((cell.as_str() == Some("1I")).then(|| Cell::text("1G")))
    })?;

    // income support: "nA" is national ("nG"), "nF" is local ("nT")
    map_column(table, "e1_combined", |_, cell| {
        Ok(cell
            .as_str()
            .and_then(|s| INCOME_LEGACY.captures(s))
            .map(|caps| {
                let flag = if &caps[2] == "A" { "G" } else { "T" };
                Cell::Text(format!("{}{}", &caps[1], flag))
            }))
    })?;
    Ok(())
}

/// A column holds bare levels only when all of its present cells are
/// numbers, or all are digit-only text (a numeric column already relabeled).
/// Blanks and the "(missing)" placeholder don't count either way.
fn is_numeric_column(cells: &[&Cell]) -> bool {
    let present: Vec<&Cell> = cells
        .iter()
        .copied()
        .filter(|c| !c.is_blank() && c.as_str() != Some(MISSING_SENTINEL))
        .collect();
    let all_numbers = present.iter().all(|c| c.as_f64().is_some());
    let all_digits = present
        .iter()
        .all(|c| c.as_str().is_some_and(|s| s.bytes().all(|b| b.is_ascii_digit())));
    all_numbers || all_digits
}

/// Ordinal relabeling of every `*_combined` column. Any value outside the
/// known shapes aborts the run, including a bare level inside a column of
/// flagged codes. Relabeled values parse back to themselves, so running this
/// twice is a no-op.
#[tracing::instrument(level = "info", skip_all)]
pub fn relabel_combined(table: &mut Table) -> Result<()> {
    let columns: Vec<String> = table
        .headers
        .iter()
        .filter(|h| h.ends_with(COMBINED_SUFFIX))
        .cloned()
        .collect();

    for column in &columns {
        let numeric = is_numeric_column(&table.column(column)?);
        map_column(table, column, |row, cell| {
            let label = match CompositeCode::parse(cell) {
                CompositeCode::Numeric(_) if !numeric => None,
                code => code.to_label(),
            };
            label.map(Some).ok_or_else(|| unrecognized(column, row, cell))
        })?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for cell in table.column(column)? {
            *counts.entry(cell.render()).or_default() += 1;
        }
        debug!(column = %column, ?counts, "value counts");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relabel(cell: Cell) -> Option<Cell> {
        CompositeCode::parse(&cell).to_label()
    }

    #[test]
    fn parse_recognizes_every_shape() {
        assert_eq!(CompositeCode::parse(&Cell::Missing), CompositeCode::Missing);
        assert_eq!(CompositeCode::parse(&Cell::text("")), CompositeCode::Empty);
        assert_eq!(CompositeCode::parse(&Cell::text("(missing)")), CompositeCode::MissingSentinel);
        assert_eq!(CompositeCode::parse(&Cell::text("0")), CompositeCode::Zero);
        assert_eq!(CompositeCode::parse(&Cell::Number(0.0)), CompositeCode::Zero);
        assert_eq!(CompositeCode::parse(&Cell::text("3T")), CompositeCode::Local("3".into()));
        assert_eq!(CompositeCode::parse(&Cell::text("2G")), CompositeCode::National("2".into()));
        assert_eq!(
            CompositeCode::parse(&Cell::text("2-National")),
            CompositeCode::National("2".into())
        );
        assert_eq!(CompositeCode::parse(&Cell::text("1I")), CompositeCode::Invalid("1I".into()));
    }

    #[test]
    fn labels_follow_severity_order() {
        assert_eq!(relabel(Cell::text("2G")), Some(Cell::text("2-National")));
        assert_eq!(relabel(Cell::text("3T")), Some(Cell::text("3-Local")));
        assert_eq!(relabel(Cell::text("0")), Some(Cell::text("0")));
        assert_eq!(relabel(Cell::Number(2.6)), Some(Cell::text("3")));
        assert_eq!(relabel(Cell::text("3")), Some(Cell::text("3")));
        assert_eq!(relabel(Cell::Missing), Some(Cell::Missing));
        assert_eq!(relabel(Cell::text("(missing)")), Some(Cell::text("(missing)")));
        assert_eq!(relabel(Cell::text("X")), None);

        let mut labels = vec!["3-Local", "2-National", "3-National", "1-Local"];
        labels.sort();
        assert_eq!(labels, vec!["1-Local", "2-National", "3-Local", "3-National"]);
    }

    fn policy_table() -> Table {
        Table::from_rows(
            "merged",
            &[
                "c1_combined",
                "c1_combined_numeric",
                "e1_combined",
                "e2_combined",
                "h2_combined",
                "h3_combined",
                "c8_combined",
                "h7_combined",
            ],
            vec![
                vec![
                    Cell::text("2G"),
                    Cell::Number(2.0),
                    Cell::text("1F"),
                    Cell::Number(0.0),
                    Cell::Number(2.0),
                    Cell::Missing,
                    Cell::Number(3.0),
                    Cell::text("1I"),
                ],
                vec![
                    Cell::text("1T"),
                    Cell::Number(0.5),
                    Cell::text("2A"),
                    Cell::Number(1.0),
                    Cell::Number(0.0),
                    Cell::Number(1.0),
                    Cell::Number(4.0),
                    Cell::text("2T"),
                ],
            ],
        )
    }

    #[test]
    fn flags_and_remaps_then_labels() {
        let mut t = policy_table();
        recode_policy_flags(&mut t).unwrap();

        assert_eq!(t.column("e2_combined").unwrap(), vec![&Cell::text("0"), &Cell::text("1G")]);
        assert_eq!(
            t.column("e2_combined_numeric").unwrap(),
            vec![&Cell::Number(0.0), &Cell::Number(1.0)]
        );
        assert_eq!(t.column("h3_combined").unwrap()[0], &Cell::Missing);
        assert_eq!(t.column("h7_combined").unwrap()[0], &Cell::text("1G"));
        assert_eq!(t.column("e1_combined").unwrap(), vec![&Cell::text("1T"), &Cell::text("2G")]);

        relabel_combined(&mut t).unwrap();
        assert_eq!(t.column("c1_combined").unwrap()[0], &Cell::text("2-National"));
        assert_eq!(t.column("h7_combined").unwrap()[0], &Cell::text("1-National"));
        assert_eq!(t.column("e1_combined").unwrap()[0], &Cell::text("1-Local"));
        assert_eq!(t.column("c8_combined").unwrap()[1], &Cell::text("4-National"));
        assert_eq!(t.column("e2_combined").unwrap()[0], &Cell::text("0"));
        // companions are not composite columns and keep their numbers
        assert_eq!(t.column("c1_combined_numeric").unwrap()[1], &Cell::Number(0.5));
    }

    #[test]
    fn relabel_is_idempotent() {
        let mut t = policy_table();
        recode_policy_flags(&mut t).unwrap();
        relabel_combined(&mut t).unwrap();
        let once = t.clone();
        relabel_combined(&mut t).unwrap();
        assert_eq!(t, once);
    }

    #[test]
    fn unexpected_value_aborts() {
        let mut t = policy_table();
        t.rows[1][0] = Cell::text("2X");
        match relabel_combined(&mut t) {
            Err(PipelineError::UnrecognizedRecodeValue { column, row, value }) => {
                assert_eq!((column.as_str(), row, value.as_str()), ("c1_combined", 1, "2X"));
            }
            other => panic!("expected UnrecognizedRecodeValue, got {:?}", other),
        }
    }

    #[test]
    fn bare_level_among_flagged_codes_aborts() {
        for stray in [Cell::Number(2.0), Cell::text("3")] {
            let mut t = Table::from_rows(
                "merged",
                &["c1_combined"],
                vec![vec![Cell::text("2G")], vec![stray.clone()]],
            );
            match relabel_combined(&mut t) {
                Err(PipelineError::UnrecognizedRecodeValue { column, row, .. }) => {
                    assert_eq!((column.as_str(), row), ("c1_combined", 1));
                }
                other => panic!("expected UnrecognizedRecodeValue for {:?}, got {:?}", stray, other),
            }
        }

        // numbers mixed with digit text are not one numeric column either
        let mut t = Table::from_rows(
            "merged",
            &["c1_combined"],
            vec![vec![Cell::Number(2.0)], vec![Cell::text("3")]],
        );
        assert!(matches!(
            relabel_combined(&mut t),
            Err(PipelineError::UnrecognizedRecodeValue { .. })
        ));
    }

    #[test]
    fn numeric_column_is_rounded_and_stays_stable() {
        let mut t = Table::from_rows(
            "merged",
            &["h8_combined"],
            vec![
                vec![Cell::Number(2.6)],
                vec![Cell::Number(0.0)],
                vec![Cell::Missing],
                vec![Cell::Number(1.0)],
            ],
        );
        relabel_combined(&mut t).unwrap();
        let expected = vec![Cell::text("3"), Cell::text("0"), Cell::Missing, Cell::text("1")];
        assert_eq!(t.column("h8_combined").unwrap(), expected.iter().collect::<Vec<_>>());
        relabel_combined(&mut t).unwrap();
        assert_eq!(t.column("h8_combined").unwrap(), expected.iter().collect::<Vec<_>>());
    }

    #[test]
    fn zero_is_accepted_alongside_flagged_codes() {
        let mut t = Table::from_rows(
            "merged",
            &["c1_combined"],
            vec![vec![Cell::text("2T")], vec![Cell::Number(0.0)], vec![Cell::text("")]],
        );
        relabel_combined(&mut t).unwrap();
        assert_eq!(
            t.column("c1_combined").unwrap(),
            vec![&Cell::text("2-Local"), &Cell::text("0"), &Cell::text("")]
        );
    }

    #[test]
    fn unflagged_column_with_text_aborts() {
        let mut t = policy_table();
        t.rows[0][4] = Cell::text("two");
        assert!(matches!(
            recode_policy_flags(&mut t),
            Err(PipelineError::UnrecognizedRecodeValue { .. })
        ));
    }
}

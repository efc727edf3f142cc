// src/process/window.rs
use chrono::{Duration, NaiveDate};
use tracing::info;

use super::{Datasets, DATE};
use crate::error::{PipelineError, Result};
use crate::table::{Cell, Table};

/// Inclusive date range shared by all tables after alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }
}

/// Earliest and latest `date` in a normalized table, or `None` when empty.
pub fn date_range(table: &Table) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for (row, cell) in table.column(DATE)?.into_iter().enumerate() {
        let d = cell.as_date().ok_or_else(|| PipelineError::UnparseableDate {
            table: table.name.clone(),
            row,
            value: cell.render(),
        })?;
        range = Some(match range {
            None => (d, d),
            Some((lo, hi)) => (lo.min(d), hi.max(d)),
        });
    }
    Ok(range)
}

/// Window = [largest min, smallest max − `lag_days`] over the two primary
/// tables. The trailing trim absorbs late reporting in both feeds.
pub fn common_window(owid: &Table, oxford: &Table, lag_days: i64) -> Result<DateWindow> {
    let empty = |t: &Table| PipelineError::EmptyIntersection {
        stage: "date window",
        detail: format!("table `{}` has no rows", t.name),
    };
    let (owid_min, owid_max) = date_range(owid)?.ok_or_else(|| empty(owid))?;
    let (ox_min, ox_max) = date_range(oxford)?.ok_or_else(|| empty(oxford))?;

    if lag_days < 0 {
        return Err(PipelineError::InvalidOption {
            option: "lag_days",
            detail: format!("must be zero or positive, got {lag_days}"),
        });
    }
    let start = owid_min.max(ox_min);
    let end = Duration::try_days(lag_days)
        .and_then(|lag| owid_max.min(ox_max).checked_sub_signed(lag))
        .ok_or_else(|| PipelineError::EmptyIntersection {
            stage: "date window",
            detail: format!("lag of {lag_days} days reaches before the earliest representable date"),
        })?;
    if start > end {
        return Err(PipelineError::EmptyIntersection {
            stage: "date window",
            detail: format!("start {start} is after end {end} (lag {lag_days} days)"),
        });
    }
    Ok(DateWindow { start, end })
}

fn window_mask(table: &Table, window: &DateWindow) -> Result<Vec<bool>> {
    Ok(table
        .column(DATE)?
        .into_iter()
        .map(|c| matches!(c, Cell::Date(d) if window.contains(*d)))
        .collect())
}

/// Window intersector: truncate all three tables to the common window.
#[tracing::instrument(level = "info", skip_all)]
pub fn intersect_dates(datasets: &mut Datasets, lag_days: i64) -> Result<DateWindow> {
    let window = common_window(&datasets.owid, &datasets.oxford, lag_days)?;
    info!(start = %window.start, end = %window.end, "intersection window of dates");

    let masks = [
        window_mask(&datasets.owid, &window)?,
        window_mask(&datasets.oxford, &window)?,
        window_mask(&datasets.oxford_nice, &window)?,
    ];
    datasets.retain("align date windows", masks);
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dated(name: &str, days: &[NaiveDate]) -> Table {
        Table::from_rows(
            name,
            &["date"],
            days.iter().map(|d| vec![Cell::Date(*d)]).collect(),
        )
    }

    fn span(start: NaiveDate, n: i64) -> Vec<NaiveDate> {
        (0..n).map(|i| start + Duration::days(i)).collect()
    }

    #[test]
    fn window_uses_largest_min_and_smallest_max_minus_lag() {
        let owid = dated("owid", &span(ymd(2020, 1, 5), 60));
        let oxford = dated("oxford", &span(ymd(2020, 1, 1), 50));
        let w = common_window(&owid, &oxford, 14).unwrap();
        assert_eq!(w.start, ymd(2020, 1, 5));
        assert_eq!(w.end, ymd(2020, 2, 19) - Duration::days(14));
    }

    #[test]
    fn all_tables_share_the_window_after_intersect() {
        let mut ds = Datasets {
            owid: dated("owid", &span(ymd(2020, 1, 5), 60)),
            oxford: dated("oxford", &span(ymd(2020, 1, 1), 50)),
            oxford_nice: dated("oxford_nice", &span(ymd(2019, 12, 1), 120)),
        };
        let w = intersect_dates(&mut ds, 14).unwrap();
        for t in ds.tables() {
            let (lo, hi) = date_range(t).unwrap().unwrap();
            assert_eq!((lo, hi), (w.start, w.end), "table {}", t.name);
        }
    }

    #[test]
    fn inverted_window_is_an_error() {
        let owid = dated("owid", &span(ymd(2020, 1, 1), 10));
        let oxford = dated("oxford", &span(ymd(2020, 1, 1), 10));
        let err = common_window(&owid, &oxford, 14).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyIntersection { .. }));
    }

    #[test]
    fn oversized_lag_is_an_error() {
        let owid = dated("owid", &span(ymd(2020, 1, 1), 30));
        let oxford = dated("oxford", &span(ymd(2020, 1, 1), 30));
        for lag in [100_000_000, i64::MAX] {
            assert!(matches!(
                common_window(&owid, &oxford, lag),
                Err(PipelineError::EmptyIntersection { .. })
            ));
        }
    }

    #[test]
    fn negative_lag_is_rejected() {
        let owid = dated("owid", &span(ymd(2020, 1, 1), 30));
        let oxford = dated("oxford", &span(ymd(2020, 1, 1), 30));
        match common_window(&owid, &oxford, -1) {
            Err(PipelineError::InvalidOption { option, .. }) => assert_eq!(option, "lag_days"),
            other => panic!("expected InvalidOption, got {:?}", other),
        }
    }

    #[test]
    fn empty_primary_table_is_an_error() {
        let owid = dated("owid", &[]);
        let oxford = dated("oxford", &span(ymd(2020, 1, 1), 30));
        assert!(matches!(
            common_window(&owid, &oxford, 0),
            Err(PipelineError::EmptyIntersection { .. })
        ));
    }

    #[test]
    fn zero_lag_keeps_boundary_days() {
        let owid = dated("owid", &span(ymd(2020, 1, 1), 3));
        let oxford = dated("oxford", &span(ymd(2020, 1, 1), 3));
        let w = common_window(&owid, &oxford, 0).unwrap();
        assert!(w.contains(ymd(2020, 1, 1)));
        assert!(w.contains(ymd(2020, 1, 3)));
        assert!(!w.contains(ymd(2020, 1, 4)));
    }
}

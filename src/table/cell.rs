// src/table/cell.rs
use chrono::NaiveDate;
use std::cmp::Ordering;

/// A single value in a [`Table`](super::Table).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Infer a cell from a raw CSV field: empty → Missing, any finite f64
    /// (surrounding blanks allowed) → Number, everything else → Text kept
    /// verbatim. `NaN` is read as missing.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Missing;
        }
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            Ok(v) if v.is_nan() => Cell::Missing,
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Missing or empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// String form used for CSV output and join keys. Dates render as
    /// `YYYY-MM-DD`, whole numbers without a fractional part.
    pub fn render(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => v.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Key used for grouping and joining; missing cells never match.
    pub fn key(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.render())
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Missing => 0,
            Cell::Number(_) => 1,
            Cell::Date(_) => 2,
            Cell::Text(_) => 3,
        }
    }

    /// Total order used when aggregating: numbers numerically, dates
    /// chronologically, text lexicographically. Mixed kinds order by kind.
    pub fn total_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Date(a), Cell::Date(b)) => a.cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_infers_kind() {
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse("12.5"), Cell::Number(12.5));
        assert_eq!(Cell::parse(" 12 "), Cell::Number(12.0));
        assert_eq!(Cell::parse("2G"), Cell::text("2G"));
        assert_eq!(Cell::parse("inf"), Cell::text("inf"));
    }

    #[test]
    fn text_is_kept_verbatim() {
        assert_eq!(Cell::parse("  "), Cell::text("  "));
        assert_eq!(Cell::parse(" Zedland"), Cell::text(" Zedland"));
        assert_ne!(Cell::parse(" Zedland").key(), Cell::parse("Zedland").key());
    }

    #[test]
    fn render_drops_trailing_zero_fraction() {
        assert_eq!(Cell::Number(20210101.0).render(), "20210101");
        assert_eq!(Cell::Number(0.5).render(), "0.5");
        let d = NaiveDate::from_ymd_opt(2021, 3, 9).unwrap();
        assert_eq!(Cell::Date(d).render(), "2021-03-09");
        assert_eq!(Cell::Missing.key(), None);
    }

    #[test]
    fn total_cmp_orders_within_kind() {
        assert_eq!(Cell::Number(2.0).total_cmp(&Cell::Number(10.0)), Ordering::Less);
        assert_eq!(Cell::text("b").total_cmp(&Cell::text("a")), Ordering::Greater);
        assert_eq!(Cell::Number(99.0).total_cmp(&Cell::text("a")), Ordering::Less);
    }
}

// src/process/finalize.rs
use crate::error::{PipelineError, Result};
use crate::table::{Cell, Table};

/// Derived outcome: new vaccinations per hundred inhabitants.
pub const VACCINATIONS_PER_HUNDRED: &str = "new_vaccinations_per_hundred";

/// `new_vaccinations / population * 100`; missing when either input is
/// missing or population is zero. Run after filler rows are restored.
pub fn add_vaccinations_per_hundred(table: &mut Table) -> Result<()> {
    let drift = |column: &str| PipelineError::SchemaDrift {
        stage: "derived columns",
        column: column.to_string(),
    };
    let vax = table
        .column_index("new_vaccinations")
        .map_err(|_| drift("new_vaccinations"))?;
    let pop = table
        .column_index("population")
        .map_err(|_| drift("population"))?;

    let values = table
        .rows
        .iter()
        .map(|r| match (r[vax].as_f64(), r[pop].as_f64()) {
            (Some(v), Some(p)) if p != 0.0 => Cell::Number(v / p * 100.0),
            _ => Cell::Missing,
        })
        .collect();
    table.upsert_column(VACCINATIONS_PER_HUNDRED, values);
    Ok(())
}

/// Public column layout: which source columns are dropped and how the
/// survivors are renamed. Every listed column must be present.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub drop: Vec<String>,
    pub rename: Vec<(String, String)>,
}

/// Composite indicator → public name; each also has a `_numeric` twin.
const INDICATOR_NAMES: [(&str, &str); 15] = [
    ("c1", "c1_school_closing"),
    ("c2", "c2_workplace_closing"),
    ("c3", "c3_cancel_public_events"),
    ("c4", "c4_restrictions_on_gatherings"),
    ("c5", "c5_close_public_transport"),
    ("c6", "c6_stay_at_home_requirements"),
    ("c7", "c7_restrictions_on_internal_movement"),
    ("c8", "c8_international_travel_controls"),
    ("e1", "e1_income_support"),
    ("e2", "e2_debt_contract_relief"),
    ("h1", "h1_public_information_campaigns"),
    ("h2", "h2_testing_policy"),
    ("h3", "h3_contact_tracing"),
    ("h6", "h6_facial_coverings"),
    ("h7", "h7_vaccination_policy"),
];

impl OutputSchema {
    pub fn standard() -> Self {
        let drop = [
            // policy tracker
            "countrycode",
            "regionname",
            "regioncode",
            "jurisdiction",
            "confirmedcases",
            "confirmeddeaths",
            "stringencyindexfordisplay",
            "stringencylegacyindex",
            "stringencylegacyindexfordisplay",
            "governmentresponseindexfordisplay",
            "containmenthealthindexfordisplay",
            "economicsupportindexfordisplay",
            // outcomes; iso_code_x is superseded by the reference code
            "location",
            "iso_code_x",
            "stringency_index",
        ]
        .map(String::from)
        .to_vec();

        let mut rename = Vec::new();
        for (code, name) in INDICATOR_NAMES {
            rename.push((format!("{code}_combined"), name.to_string()));
            rename.push((format!("{code}_combined_numeric"), format!("{name}_numeric")));
        }
        let fixed = [
            ("e3_fiscal measures", "e3_fiscal_measures"),
            ("e4_international support", "e4_international_support"),
            (
                "h4_emergency investment in healthcare",
                "h4_emergency_investment_in_healthcare",
            ),
            ("h5_investment in vaccines", "h5_investment_in_vaccines"),
            ("stringencyindex", "stringency_index"),
            ("governmentresponseindex", "government_response_index"),
            ("containmenthealthindex", "containment_health_index"),
            ("economicsupportindex", "economic_support_index"),
            ("iso_code_y", "iso_code"),
        ];
        rename.extend(fixed.map(|(from, to)| (from.to_string(), to.to_string())));
        Self { drop, rename }
    }

    /// Check the whole layout first, then drop and rename.
    pub fn apply(&self, table: &mut Table) -> Result<()> {
        for column in self.drop.iter().chain(self.rename.iter().map(|(from, _)| from)) {
            if !table.has_column(column) {
                return Err(PipelineError::SchemaDrift {
                    stage: "finalize columns",
                    column: column.to_string(),
                });
            }
        }
        let drop: Vec<&str> = self.drop.iter().map(String::as_str).collect();
        table.drop_columns(&drop)?;
        for (from, to) in &self.rename {
            table.rename_column(from, to)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_hundred_uses_population() {
        let mut t = Table::from_rows(
            "merged",
            &["new_vaccinations", "population"],
            vec![
                vec![Cell::Number(10.0), Cell::Number(100.0)],
                vec![Cell::Missing, Cell::Number(100.0)],
                vec![Cell::Number(5.0), Cell::Number(0.0)],
            ],
        );
        add_vaccinations_per_hundred(&mut t).unwrap();
        let col = t.column(VACCINATIONS_PER_HUNDRED).unwrap();
        assert_eq!(col[0], &Cell::Number(10.0));
        assert!(col[1].is_missing());
        assert!(col[2].is_missing());
    }

    #[test]
    fn schema_is_checked_before_anything_changes() {
        let schema = OutputSchema {
            drop: vec!["a".into()],
            rename: vec![("b".into(), "bee".into()), ("zzz".into(), "z".into())],
        };
        let mut t = Table::from_rows("merged", &["a", "b"], vec![]);
        match schema.apply(&mut t) {
            Err(PipelineError::SchemaDrift { column, .. }) => assert_eq!(column, "zzz"),
            other => panic!("expected SchemaDrift, got {:?}", other),
        }
        assert_eq!(t.headers, vec!["a", "b"]);
    }

    #[test]
    fn drop_then_rename() {
        let schema = OutputSchema {
            drop: vec!["iso_code_x".into()],
            rename: vec![
                ("iso_code_y".into(), "iso_code".into()),
                ("c1_combined".into(), "c1_school_closing".into()),
            ],
        };
        let mut t = Table::from_rows(
            "merged",
            &["c1_combined", "iso_code_x", "iso_code_y"],
            vec![],
        );
        schema.apply(&mut t).unwrap();
        assert_eq!(t.headers, vec!["c1_school_closing", "iso_code"]);
    }

    #[test]
    fn standard_schema_names_every_indicator() {
        let schema = OutputSchema::standard();
        let has = |from: &str, to: &str| schema.rename.iter().any(|(f, t)| f == from && t == to);
        assert!(has("h7_combined", "h7_vaccination_policy"));
        assert!(has("c1_combined_numeric", "c1_school_closing_numeric"));
        assert_eq!(schema.rename.len(), 15 * 2 + 9);
    }
}

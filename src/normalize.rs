use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::table::{format_number, Cell, Table};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

lazy_static! {
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9.\-]").unwrap();
}

/// What an absent cell turns into during text normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Absent cells stay absent and compare equal to the empty string.
    #[default]
    Empty,
    /// Absent cells become the text `nan`, as a stringified null would.
    #[value(name = "nan")]
    LiteralNan,
}

/// `" Policy Status "` -> `"policy_status"`.
pub fn standardize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

pub fn standardize_columns(table: Table) -> Table {
    table.map_columns(standardize_column_name)
}

/// Text normalization applied to every cell.
pub fn normalize_cell(cell: &Cell, policy: NullPolicy) -> Cell {
    match cell {
        Cell::Text(s) => Cell::Text(s.trim().to_string()),
        Cell::Number(n) => Cell::Text(format_number(*n)),
        Cell::Missing => match policy {
            NullPolicy::Empty => Cell::Missing,
            NullPolicy::LiteralNan => Cell::text("nan"),
        },
    }
}

/// Strip everything but digits, `.` and `-`, then parse. Nothing left means missing.
pub fn clean_numeric(cell: &Cell, column: &str) -> Result<Cell> {
    let text = match cell {
        Cell::Missing => return Ok(Cell::Missing),
        Cell::Number(n) => return Ok(Cell::Number(*n)),
        Cell::Text(s) => s,
    };

    let cleaned = NON_NUMERIC.replace_all(text, "");
    if cleaned.is_empty() {
        return Ok(Cell::Missing);
    }

    cleaned
        .parse::<f64>()
        .map(Cell::Number)
        .map_err(|_| AuditError::NumericParse {
            column: column.to_string(),
            value: text.clone(),
        })
}

/// Returns a normalized copy of `table`: every cell trimmed to text, then the
/// configured numeric fields parsed. Column names are left as they are; call
/// [`standardize_columns`] first.
pub fn normalize_table(table: &Table, config: &AuditConfig) -> Result<Table> {
    let numeric: Vec<(usize, &str)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| config.is_numeric(name))
        .map(|(idx, name)| (idx, name.as_str()))
        .collect();

    let mut rows = Vec::with_capacity(table.height());
    for row in table.rows() {
        let mut cells: Vec<Cell> = row
            .iter()
            .map(|c| normalize_cell(c, config.null_policy))
            .collect();
        for &(idx, name) in &numeric {
            cells[idx] = clean_numeric(&cells[idx], name)?;
        }
        rows.push(cells);
    }

    debug!(
        rows = rows.len(),
        numeric_columns = numeric.len(),
        "normalized table"
    );
    Ok(Table::from_parts(table.columns().to_vec(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(policy: NullPolicy) -> AuditConfig {
        AuditConfig {
            null_policy: policy,
            ..AuditConfig::default()
        }
    }

    #[test]
    fn test_standardize_column_name() {
        assert_eq!(standardize_column_name("  Policy Status "), "policy_status");
        assert_eq!(standardize_column_name("FFM Subscriber ID"), "ffm_subscriber_id");
        assert_eq!(standardize_column_name("net_premium"), "net_premium");
    }

    #[test]
    fn test_clean_numeric() {
        assert_eq!(
            clean_numeric(&Cell::text("$1,234.50"), "subsidy").unwrap(),
            Cell::Number(1234.5)
        );
        assert_eq!(
            clean_numeric(&Cell::text("-$12"), "subsidy").unwrap(),
            Cell::Number(-12.0)
        );
        assert_eq!(clean_numeric(&Cell::text("n/a"), "subsidy").unwrap(), Cell::Missing);
        assert_eq!(clean_numeric(&Cell::text("nan"), "subsidy").unwrap(), Cell::Missing);
    }

    #[test]
    fn test_clean_numeric_parse_failure() {
        let err = clean_numeric(&Cell::text("1.2.3"), "net_premium").unwrap_err();
        match err {
            AuditError::NumericParse { column, value } => {
                assert_eq!(column, "net_premium");
                assert_eq!(value, "1.2.3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_policy() {
        assert_eq!(normalize_cell(&Cell::Missing, NullPolicy::Empty), Cell::Missing);
        assert_eq!(
            normalize_cell(&Cell::Missing, NullPolicy::LiteralNan),
            Cell::text("nan")
        );
    }

    #[test]
    fn test_normalize_table_leaves_input_untouched() {
        let raw = Table::from_text_rows(
            &["ffm_subscriber_id", "policy_status", "net_premium"],
            &[vec![Some(" A "), Some("Active "), Some("$100.00")], vec![Some("B"), None, None]],
        );
        let normalized = normalize_table(&raw, &config(NullPolicy::LiteralNan)).unwrap();

        assert_eq!(raw.cell(0, "ffm_subscriber_id"), Some(&Cell::text(" A ")));
        assert_eq!(normalized.cell(0, "ffm_subscriber_id"), Some(&Cell::text("A")));
        assert_eq!(normalized.cell(0, "policy_status"), Some(&Cell::text("Active")));
        assert_eq!(normalized.cell(0, "net_premium"), Some(&Cell::Number(100.0)));
        assert_eq!(normalized.cell(1, "policy_status"), Some(&Cell::text("nan")));
        assert_eq!(normalized.cell(1, "net_premium"), Some(&Cell::Missing));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let raw = Table::from_text_rows(
            &["ffm_subscriber_id", "subsidy", "plan_hios_id"],
            &[
                vec![Some("A"), Some("$ 50"), Some(" 12345TX ")],
                vec![Some("B"), None, None],
            ],
        );
        for policy in [NullPolicy::Empty, NullPolicy::LiteralNan] {
            let once = normalize_table(&raw, &config(policy)).unwrap();
            let twice = normalize_table(&once, &config(policy)).unwrap();
            assert_eq!(once, twice);
        }
    }
}

//! CSV loading and report export.

use crate::audit::ChangeLog;
use crate::config::AuditConfig;
use crate::error::{AuditError, Result, Side};
use crate::matcher::{MatchResult, Provenance};
use crate::normalize::standardize_columns;
use crate::table::{Cell, Table};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the provenance column appended to the new/missing record reports.
pub const PROVENANCE_COLUMN: &str = "_merge";

/// Read a CSV file with every column as text. Empty fields come back as `Missing`.
pub fn read_csv(path: &Path) -> Result<Table> {
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;
    dataframe_to_table(&df)
}

pub fn dataframe_to_table(df: &DataFrame) -> Result<Table> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut rows: Vec<Vec<Cell>> = vec![Vec::with_capacity(columns.len()); df.height()];

    for series in df.get_columns() {
        let series = series.cast(&DataType::String)?;
        let values = series.str()?;
        for (row, value) in rows.iter_mut().zip(values.into_iter()) {
            row.push(match value {
                Some(s) => Cell::text(s),
                None => Cell::Missing,
            });
        }
    }

    Ok(Table::from_parts(columns, rows))
}

pub fn table_to_dataframe(table: &Table) -> Result<DataFrame> {
    let series: Vec<Series> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Option<String>> =
                table.rows().iter().map(|row| row[idx].render()).collect();
            Series::new(name, values)
        })
        .collect();
    Ok(DataFrame::new(series)?)
}

pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut df = table_to_dataframe(table)?;
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;
    Ok(())
}

fn load_side(path: &Path, side: Side) -> Result<Table> {
    if !path.exists() {
        return Err(AuditError::InputNotFound {
            side,
            path: path.to_path_buf(),
        });
    }
    info!("Loading {}: {}", side, path.display());
    let table = standardize_columns(read_csv(path)?);
    info!(
        rows = table.height(),
        columns = table.width(),
        "loaded {}",
        side
    );
    Ok(table)
}

/// Load both extracts with standardized column names, the CRM key renamed to
/// the canonical key, and the key checked on both sides.
#[tracing::instrument(level = "info", skip(config), fields(key = %config.key))]
pub fn load_inputs(config: &AuditConfig) -> Result<(Table, Table)> {
    let mp = load_side(&config.mp_input(), Side::Mp)?;
    let mut crm = load_side(&config.crm_input(), Side::Crm)?;

    if let Some(alias) = &config.crm_key_alias {
        if crm.has_column(alias) {
            if crm.has_column(&config.key) {
                warn!(alias = %alias, "CRM has both the key and its alias; keeping the key");
            } else {
                crm.rename_column(alias, &config.key);
            }
        }
    }

    if !mp.has_column(&config.key) {
        return Err(AuditError::MissingKey {
            side: Side::Mp,
            key: config.key.clone(),
        });
    }
    if !crm.has_column(&config.key) {
        return Err(AuditError::MissingKey {
            side: Side::Crm,
            key: config.key.clone(),
        });
    }

    Ok((mp, crm))
}

/// Copy of `table` with the provenance column appended.
pub fn with_provenance(table: &Table, provenance: Provenance) -> Table {
    let (mut columns, rows) = table.clone().into_parts();
    columns.push(PROVENANCE_COLUMN.to_string());
    let rows = rows
        .into_iter()
        .map(|mut row| {
            row.push(Cell::text(provenance.as_str()));
            row
        })
        .collect();
    Table::from_parts(columns, rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub output_dir: PathBuf,
    pub new_records: PathBuf,
    pub missing_records: PathBuf,
    pub critical_changes: PathBuf,
}

/// Write the three report files, creating the output directory if needed.
pub fn write_reports(
    config: &AuditConfig,
    matched: &MatchResult,
    changes: &ChangeLog,
) -> Result<ReportPaths> {
    let output_dir = config.output_path();
    fs::create_dir_all(&output_dir)?;

    let paths = ReportPaths {
        new_records: output_dir.join(&config.reports.new_records),
        missing_records: output_dir.join(&config.reports.missing_records),
        critical_changes: output_dir.join(&config.reports.critical_changes),
        output_dir,
    };

    write_csv(
        &with_provenance(&matched.new_records, Provenance::LeftOnly),
        &paths.new_records,
    )?;
    write_csv(
        &with_provenance(&matched.missing_records, Provenance::RightOnly),
        &paths.missing_records,
    )?;
    write_csv(&changes.to_table(), &paths.critical_changes)?;

    info!(dir = %paths.output_dir.display(), "wrote audit reports");
    Ok(paths)
}

use crate::audit::{detect_critical_changes, ChangeLog};
use crate::config::AuditConfig;
use crate::error::Result;
use crate::io::{load_inputs, write_reports, ReportPaths};
use crate::matcher::{match_tables, MatchResult};
use crate::normalize::normalize_table;
use crate::summary::AuditSummary;
use crate::table::Table;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub matched: MatchResult,
    pub changes: ChangeLog,
    pub summary: AuditSummary,
}

/// Normalize, match, audit and summarize two already-loaded tables.
/// Column names are expected to be standardized.
pub fn audit_tables(mp: &Table, crm: &Table, config: &AuditConfig) -> Result<AuditOutcome> {
    let mp = normalize_table(mp, config)?;
    let crm = normalize_table(crm, config)?;

    let matched = match_tables(&mp, &crm, &config.key)?;
    let changes = detect_critical_changes(&matched.common, &matched.schema, &config.critical_fields);
    let summary = AuditSummary::compute(
        &matched.new_records,
        &matched.missing_records,
        &changes,
        &config.critical_fields,
    );

    Ok(AuditOutcome {
        matched,
        changes,
        summary,
    })
}

/// Full run: load both files, audit, then write the reports. Nothing is
/// written unless every earlier step succeeded.
pub fn run_audit(config: &AuditConfig) -> Result<(AuditOutcome, ReportPaths)> {
    config.validate()?;
    let (mp, crm) = load_inputs(config)?;
    let outcome = audit_tables(&mp, &crm, config)?;
    let paths = write_reports(config, &outcome.matched, &outcome.changes)?;
    info!(
        new = outcome.summary.new_records,
        missing = outcome.summary.missing_records,
        changed = outcome.summary.changed_subscribers,
        "audit complete"
    );
    Ok((outcome, paths))
}

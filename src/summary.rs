use crate::audit::ChangeLog;
use crate::table::Table;
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct AuditSummary {
    pub new_records: usize,
    pub missing_records: usize,
    /// Distinct subscribers with at least one critical change.
    pub changed_subscribers: usize,
    pub change_rows: usize,
    /// Change rows per field, highest count first.
    pub changes_by_field: Vec<(String, usize)>,
}

impl AuditSummary {
    /// Ties in the per-field tally follow `field_order`; fields not listed
    /// there sort after it by name.
    pub fn compute(
        new_records: &Table,
        missing_records: &Table,
        changes: &ChangeLog,
        field_order: &[String],
    ) -> Self {
        let changed_subscribers = changes
            .records()
            .iter()
            .map(|r| r.key.render().unwrap_or_default())
            .unique()
            .count();

        let rank = |field: &str| {
            field_order
                .iter()
                .position(|f| f == field)
                .unwrap_or(field_order.len())
        };
        let changes_by_field = changes
            .records()
            .iter()
            .map(|r| r.changed_field.clone())
            .counts()
            .into_iter()
            .sorted_by(|(fa, ca), (fb, cb)| {
                cb.cmp(ca)
                    .then_with(|| rank(fa.as_str()).cmp(&rank(fb.as_str())))
                    .then_with(|| fa.cmp(fb))
            })
            .collect();

        Self {
            new_records: new_records.height(),
            missing_records: missing_records.height(),
            changed_subscribers,
            change_rows: changes.len(),
            changes_by_field,
        }
    }
}

impl fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n========== MARKETPLACE AUDIT ==========")?;
        writeln!(f, "New in Marketplace: {}", self.new_records)?;
        writeln!(f, "Cancelled or missing in MP: {}", self.missing_records)?;
        writeln!(f, "Records with critical changes: {}", self.changed_subscribers)?;

        if !self.changes_by_field.is_empty() {
            writeln!(f, "\nChanges by type:")?;
            let width = self
                .changes_by_field
                .iter()
                .map(|(field, _)| field.len())
                .max()
                .unwrap_or(0);
            for (field, count) in &self.changes_by_field {
                writeln!(f, "{:<width$}  {}", field, count, width = width)?;
            }
        }

        writeln!(f, "=======================================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::detect_critical_changes;
    use crate::matcher::match_tables;

    fn scenario() -> (Table, Table) {
        let mp = Table::from_text_rows(
            &["ffm_subscriber_id", "policy_status", "plan_hios_id", "subsidy"],
            &[
                vec![Some("A"), Some("active"), Some("P1"), Some("10")],
                vec![Some("B"), Some("active"), Some("P2"), Some("20")],
                vec![Some("C"), Some("active"), Some("P3"), Some("30")],
                vec![Some("N"), Some("active"), Some("P4"), Some("40")],
            ],
        );
        let crm = Table::from_text_rows(
            &["ffm_subscriber_id", "policy_status", "plan_hios_id", "subsidy"],
            &[
                vec![Some("A"), Some("cancelled"), Some("P9"), Some("99")],
                vec![Some("B"), Some("cancelled"), Some("P2"), Some("20")],
                vec![Some("C"), Some("active"), Some("P3"), Some("31")],
                vec![Some("X"), Some("active"), Some("P5"), Some("50")],
                vec![Some("Y"), Some("active"), Some("P6"), Some("60")],
            ],
        );
        (mp, crm)
    }

    #[test]
    fn test_summary_counts() {
        let (mp, crm) = scenario();
        let fields: Vec<String> = ["plan_hios_id", "policy_status", "subsidy"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let matched = match_tables(&mp, &crm, "ffm_subscriber_id").unwrap();
        let log = detect_critical_changes(&matched.common, &matched.schema, &fields);
        let summary =
            AuditSummary::compute(&matched.new_records, &matched.missing_records, &log, &fields);

        assert_eq!(summary.new_records, 1);
        assert_eq!(summary.missing_records, 2);
        assert_eq!(summary.change_rows, 5);
        assert_eq!(summary.changed_subscribers, 3);
        assert!(summary.changed_subscribers <= summary.change_rows);
        assert_eq!(
            summary.changes_by_field,
            vec![
                ("policy_status".to_string(), 2),
                ("subsidy".to_string(), 2),
                ("plan_hios_id".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_summary_of_empty_log() {
        let empty = Table::new(vec!["ffm_subscriber_id".to_string()]);
        let log = ChangeLog::new("ffm_subscriber_id");
        let summary = AuditSummary::compute(&empty, &empty, &log, &[]);

        assert_eq!(summary.changed_subscribers, 0);
        assert!(summary.changes_by_field.is_empty());
        let rendered = summary.to_string();
        assert!(rendered.contains("Records with critical changes: 0"));
        assert!(!rendered.contains("Changes by type"));
    }

    #[test]
    fn test_display_lists_fields() {
        let summary = AuditSummary {
            new_records: 3,
            missing_records: 1,
            changed_subscribers: 2,
            change_rows: 3,
            changes_by_field: vec![("net_premium".to_string(), 2), ("subsidy".to_string(), 1)],
        };
        let rendered = summary.to_string();
        assert!(rendered.contains("New in Marketplace: 3"));
        assert!(rendered.contains("Cancelled or missing in MP: 1"));
        assert!(rendered.contains("net_premium  2"));
        assert!(rendered.contains("subsidy      1"));
    }
}

use crate::matcher::MergedSchema;
use crate::table::{Cell, Table};
use tracing::{debug, info};

pub const MP_VALUE_COLUMN: &str = "mp_value";
pub const CRM_VALUE_COLUMN: &str = "crm_value";
pub const CHANGED_FIELD_COLUMN: &str = "changed_field";

/// One critical field that differs between MP and CRM for one subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub key: Cell,
    pub mp_value: Cell,
    pub crm_value: Cell,
    pub changed_field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLog {
    key_column: String,
    records: Vec<ChangeRecord>,
}

impl ChangeLog {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            records: Vec::new(),
        }
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columns are always `<key>, mp_value, crm_value, changed_field`, even with no rows.
    pub fn to_table(&self) -> Table {
        let columns = vec![
            self.key_column.clone(),
            MP_VALUE_COLUMN.to_string(),
            CRM_VALUE_COLUMN.to_string(),
            CHANGED_FIELD_COLUMN.to_string(),
        ];
        let rows = self
            .records
            .iter()
            .map(|r| {
                vec![
                    r.key.clone(),
                    r.mp_value.clone(),
                    r.crm_value.clone(),
                    Cell::text(&r.changed_field),
                ]
            })
            .collect();
        Table::from_parts(columns, rows)
    }
}

#[derive(Debug, PartialEq)]
enum Comparable<'a> {
    Text(&'a str),
    Number(f64),
}

/// Missing compares as the empty string.
fn comparable(cell: &Cell) -> Comparable<'_> {
    match cell {
        Cell::Text(s) => Comparable::Text(s),
        Cell::Number(n) => Comparable::Number(*n),
        Cell::Missing => Comparable::Text(""),
    }
}

pub fn values_match(mp: &Cell, crm: &Cell) -> bool {
    comparable(mp) == comparable(crm)
}

/// Scan rows present on both sides for differences in `fields`.
///
/// Output is grouped by field in the order given, rows within a field in
/// `common` order. Fields without a `_mp`/`_crm` pair are skipped.
pub fn detect_critical_changes(
    common: &Table,
    schema: &MergedSchema,
    fields: &[String],
) -> ChangeLog {
    let mut log = ChangeLog::new(schema.key());
    let key_idx = schema.key_index();

    for field in fields {
        let Some(pair) = schema.shared_column(field) else {
            debug!(field = %field, "critical field not present on both sides, skipping");
            continue;
        };

        let before = log.records.len();
        for row in common.rows() {
            let (mp, crm) = (&row[pair.mp], &row[pair.crm]);
            if !values_match(mp, crm) {
                log.records.push(ChangeRecord {
                    key: row[key_idx].clone(),
                    mp_value: mp.clone(),
                    crm_value: crm.clone(),
                    changed_field: field.clone(),
                });
            }
        }
        debug!(field = %field, changes = log.records.len() - before, "compared field");
    }

    info!(changes = log.len(), "critical change scan complete");
    log
}

//! Full outer join of the MP and CRM tables on the join key, expressed as an
//! explicit three-way partition over the two key sets.

use crate::error::{AuditError, Result, Side};
use crate::table::{Cell, Table};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{info, warn};

pub const MP_SUFFIX: &str = "_mp";
pub const CRM_SUFFIX: &str = "_crm";

/// Where a merged row's key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Only in MP.
    LeftOnly,
    /// Only in CRM.
    RightOnly,
    Both,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::LeftOnly => "left_only",
            Provenance::RightOnly => "right_only",
            Provenance::Both => "both",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column positions of a field present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedColumn {
    pub mp: usize,
    pub crm: usize,
}

/// Column layout shared by the merged table and all three partitions:
/// the key, then MP columns, then CRM columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSchema {
    key: String,
    columns: Vec<String>,
    shared: HashMap<String, SharedColumn>,
}

impl MergedSchema {
    fn build(key: &str, mp: &Table, crm: &Table) -> Self {
        let mp_cols: Vec<&String> = mp.columns().iter().filter(|c| *c != key).collect();
        let crm_cols: Vec<&String> = crm.columns().iter().filter(|c| *c != key).collect();
        let crm_set: HashSet<&String> = crm_cols.iter().copied().collect();
        let mp_set: HashSet<&String> = mp_cols.iter().copied().collect();

        let mut columns = vec![key.to_string()];
        let mut mp_pos: HashMap<&String, usize> = HashMap::new();
        for c in &mp_cols {
            mp_pos.insert(*c, columns.len());
            if crm_set.contains(c) {
                columns.push(format!("{}{}", c, MP_SUFFIX));
            } else {
                columns.push((*c).clone());
            }
        }

        let mut shared = HashMap::new();
        for c in &crm_cols {
            if mp_set.contains(c) {
                shared.insert(
                    (*c).clone(),
                    SharedColumn {
                        mp: mp_pos[c],
                        crm: columns.len(),
                    },
                );
                columns.push(format!("{}{}", c, CRM_SUFFIX));
            } else {
                columns.push((*c).clone());
            }
        }

        Self {
            key: key.to_string(),
            columns,
            shared,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Position of the key column in every merged row.
    pub fn key_index(&self) -> usize {
        0
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// `None` when `field` is missing from either side, so there is no
    /// `_mp`/`_crm` pair to compare.
    pub fn shared_column(&self, field: &str) -> Option<SharedColumn> {
        self.shared.get(field).copied()
    }
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub schema: MergedSchema,
    /// Every joined row, in merge order.
    pub merged: Table,
    pub provenance: Vec<Provenance>,
    /// Present in MP, absent in CRM.
    pub new_records: Table,
    /// Present in CRM, absent in MP.
    pub missing_records: Table,
    pub common: Table,
}

impl MatchResult {
    pub fn count(&self, provenance: Provenance) -> usize {
        self.provenance.iter().filter(|p| **p == provenance).count()
    }
}

fn key_of(row: &[Cell], idx: usize) -> String {
    row[idx].render().unwrap_or_default()
}

fn non_key(row: &[Cell], key_idx: usize) -> Vec<Cell> {
    row.iter()
        .enumerate()
        .filter(|(i, _)| *i != key_idx)
        .map(|(_, c)| c.clone())
        .collect()
}

/// Join `mp` and `crm` on `key` and split the result by provenance.
///
/// Rows come out in MP order, each MP row followed by its CRM matches in CRM
/// order; CRM rows whose key never appears in MP follow at the end. Duplicate
/// keys multiply.
pub fn match_tables(mp: &Table, crm: &Table, key: &str) -> Result<MatchResult> {
    let mp_key = mp.column_index(key).ok_or_else(|| AuditError::MissingKey {
        side: Side::Mp,
        key: key.to_string(),
    })?;
    let crm_key = crm.column_index(key).ok_or_else(|| AuditError::MissingKey {
        side: Side::Crm,
        key: key.to_string(),
    })?;

    let schema = MergedSchema::build(key, mp, crm);

    let mut crm_by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in crm.rows().iter().enumerate() {
        crm_by_key.entry(key_of(row, crm_key)).or_default().push(i);
    }
    let mp_keys: HashSet<String> = mp.rows().iter().map(|r| key_of(r, mp_key)).collect();

    let duplicated = crm_by_key.values().filter(|v| v.len() > 1).count();
    if duplicated > 0 {
        warn!(keys = duplicated, "duplicate keys in CRM; matching rows will multiply");
    }
    if mp_keys.len() < mp.height() {
        warn!(
            rows = mp.height() - mp_keys.len(),
            "duplicate keys in MP; matching rows will multiply"
        );
    }

    let mp_width = mp.width().saturating_sub(1);
    let crm_width = crm.width().saturating_sub(1);
    let mut rows = Vec::new();
    let mut provenance = Vec::new();

    for mp_row in mp.rows() {
        let k = key_of(mp_row, mp_key);
        match crm_by_key.get(&k) {
            Some(matches) => {
                for &j in matches {
                    let crm_row = &crm.rows()[j];
                    let mut row = vec![mp_row[mp_key].clone()];
                    row.extend(non_key(mp_row, mp_key));
                    row.extend(non_key(crm_row, crm_key));
                    rows.push(row);
                    provenance.push(Provenance::Both);
                }
            }
            None => {
                let mut row = vec![mp_row[mp_key].clone()];
                row.extend(non_key(mp_row, mp_key));
                row.extend(std::iter::repeat(Cell::Missing).take(crm_width));
                rows.push(row);
                provenance.push(Provenance::LeftOnly);
            }
        }
    }

    for crm_row in crm.rows() {
        if mp_keys.contains(&key_of(crm_row, crm_key)) {
            continue;
        }
        let mut row = vec![crm_row[crm_key].clone()];
        row.extend(std::iter::repeat(Cell::Missing).take(mp_width));
        row.extend(non_key(crm_row, crm_key));
        rows.push(row);
        provenance.push(Provenance::RightOnly);
    }

    let select = |wanted: Provenance| -> Table {
        let picked = rows
            .iter()
            .zip(&provenance)
            .filter(|(_, p)| **p == wanted)
            .map(|(r, _)| r.clone())
            .collect();
        Table::from_parts(schema.columns().to_vec(), picked)
    };

    let new_records = select(Provenance::LeftOnly);
    let missing_records = select(Provenance::RightOnly);
    let common = select(Provenance::Both);
    let merged = Table::from_parts(schema.columns().to_vec(), rows);

    info!(
        merged = merged.height(),
        new = new_records.height(),
        missing = missing_records.height(),
        common = common.height(),
        "matched MP against CRM"
    );

    Ok(MatchResult {
        schema,
        merged,
        provenance,
        new_records,
        missing_records,
        common,
    })
}

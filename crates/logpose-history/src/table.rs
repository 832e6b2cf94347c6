//! Tabular views over records. Uses the eager polars API only.

use std::fs::File;
use std::path::Path;

use indexmap::IndexSet;
use logpose_core::record::DESCRIPTION_KEY;
use logpose_core::{Record, RecordKey};
use polars::prelude::*;
use serde_json::Value;

use crate::error::{HistoryError, Result};

/// Leading column of a single-record table: one row per route.
pub const ROUTE_COLUMN: &str = "route";
/// Leading column of a comparison table: the source record of each row.
pub const RECORD_COLUMN: &str = "record";
/// Joins route and parameter in comparison column labels: `train/lr`.
pub const COLUMN_SEPARATOR: char = '/';
const ESCAPE: char = '\\';

/// Builds a typed column from JSON values.
///
/// Integers that all fit `i64` become `Int64`, other numbers `Float64`, booleans `Boolean`,
/// anything else `String` (non-string values rendered as JSON). Missing values and JSON `null`
/// are nulls.
fn json_column(name: &str, values: &[Option<&Value>]) -> Column {
    let present: Vec<Option<&Value>> = values
        .iter()
        .map(|v| v.filter(|v| !v.is_null()))
        .collect();
    let mut defined = present.iter().flatten();
    if defined.clone().all(|v| v.is_i64()) {
        let ints: Vec<Option<i64>> = present.iter().map(|v| v.and_then(Value::as_i64)).collect();
        return Series::new(name.into(), ints).into();
    }
    if defined.clone().all(|v| v.is_number()) {
        let floats: Vec<Option<f64>> = present.iter().map(|v| v.and_then(Value::as_f64)).collect();
        return Series::new(name.into(), floats).into();
    }
    if defined.all(|v| v.is_boolean()) {
        let bools: Vec<Option<bool>> = present.iter().map(|v| v.and_then(Value::as_bool)).collect();
        return Series::new(name.into(), bools).into();
    }
    let strings: Vec<Option<String>> = present
        .iter()
        .map(|v| {
            v.map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .collect();
    Series::new(name.into(), strings).into()
}

/// [`ROUTE_COLUMN`], with `_` appended until it differs from every parameter name.
fn route_column_name(params: &IndexSet<&str>) -> String {
    let mut name = ROUTE_COLUMN.to_string();
    while params.contains(name.as_str()) {
        name.push('_');
    }
    name
}

/// One row per route, one column per parameter (union over routes, first-seen order).
/// This is the transpose of the record's `subunits` mapping.
///
/// The first column always holds the route names. It is called `route` unless a parameter has
/// that name, in which case it becomes `route_` (or `route__`, ...).
pub fn record_table(record: &Record) -> PolarsResult<DataFrame> {
    let params: IndexSet<&str> = record
        .routes
        .values()
        .flat_map(|bag| bag.keys().map(String::as_str))
        .collect();
    let names: Vec<String> = record.routes.keys().cloned().collect();
    let route_column = route_column_name(&params);
    let mut columns: Vec<Column> = vec![Series::new(route_column.into(), names).into()];
    for param in params {
        let values: Vec<Option<&Value>> =
            record.routes.values().map(|bag| bag.get(param)).collect();
        columns.push(json_column(param, &values));
    }
    DataFrame::new(columns)
}

fn escape_label_part(part: &str, out: &mut String) {
    for c in part.chars() {
        if c == COLUMN_SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

/// Two-level column label: parameters recorded under one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    pub route: String,
    pub params: Vec<String>,
}

impl ColumnGroup {
    pub fn labels(&self) -> impl Iterator<Item = String> + '_ {
        self.params.iter().map(|p| column_label(&self.route, p))
    }
}

/// `route/param`. A `/` or `\` inside either name is escaped with `\`, so distinct
/// (route, param) pairs never share a label: route `a` with `b/c` is `a/b\/c`, route `a/b`
/// with `c` is `a\/b/c`.
pub fn column_label(route: &str, param: &str) -> String {
    let mut label = String::with_capacity(route.len() + param.len() + 1);
    escape_label_part(route, &mut label);
    label.push(COLUMN_SEPARATOR);
    escape_label_part(param, &mut label);
    label
}

/// Records side by side: one row per record (key order), one column group per route.
#[derive(Debug, Clone)]
pub struct ComparisonTable {
    frame: DataFrame,
    groups: Vec<ColumnGroup>,
    keys: Vec<RecordKey>,
}

impl ComparisonTable {
    /// Builds the table. The caller has already checked that every record has the same routes;
    /// groups follow the route order of the first record.
    pub(crate) fn build(keys: &[RecordKey], records: &[Record]) -> PolarsResult<Self> {
        let raw_keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let mut columns: Vec<Column> = vec![Series::new(RECORD_COLUMN.into(), raw_keys).into()];
        let mut groups = Vec::new();
        let routes: Vec<&str> = records
            .first()
            .map(|r| r.route_names().collect())
            .unwrap_or_default();
        for route in routes {
            let bags: Vec<_> = records.iter().map(|r| r.route(route)).collect();
            let params: IndexSet<&str> = bags
                .iter()
                .flatten()
                .flat_map(|bag| bag.keys().map(String::as_str))
                .filter(|k| *k != DESCRIPTION_KEY)
                .collect();
            for param in &params {
                let values: Vec<Option<&Value>> =
                    bags.iter().map(|bag| bag.and_then(|b| b.get(*param))).collect();
                columns.push(json_column(&column_label(route, param), &values));
            }
            groups.push(ColumnGroup {
                route: route.to_string(),
                params: params.into_iter().map(String::from).collect(),
            });
        }
        Ok(Self {
            frame: DataFrame::new(columns)?,
            groups,
            keys: keys.to_vec(),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    /// Row index: the record key of each row.
    pub fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column(&self, route: &str, param: &str) -> Option<&Column> {
        self.frame.column(&column_label(route, param)).ok()
    }

    /// Writes the table as CSV, header included.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::Export {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let mut file = File::create(path).map_err(|source| HistoryError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        let mut frame = self.frame.clone();
        CsvWriter::new(&mut file).include_header(true).finish(&mut frame)?;
        tracing::debug!(path = %path.display(), rows = frame.height(), "comparison exported");
        Ok(())
    }
}

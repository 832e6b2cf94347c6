use std::collections::BTreeSet;
use std::sync::Arc;

use logpose_core::{
    JsonDirStore, LogposeConfig, LogposeError, Record, RecordKey, RecordStore, SessionSummary,
};
use polars::prelude::DataFrame;

use crate::error::{HistoryError, Result};
use crate::table::{ComparisonTable, record_table};

/// Access to the records persisted under one logpose name.
///
/// The key list is a snapshot taken when the history is opened; records written afterwards
/// are not seen.
pub struct History {
    name: String,
    store: Arc<dyn RecordStore>,
    keys: Vec<RecordKey>,
}

impl History {
    /// Opens the history of `name` under `config.root`.
    pub fn open(name: impl Into<String>, config: &LogposeConfig) -> Result<Self> {
        Self::with_store(name, Arc::new(JsonDirStore::new(config.root.clone())))
    }

    /// Fails with [`HistoryError::NoHistory`] when the namespace is missing or holds no records.
    pub fn with_store(name: impl Into<String>, store: Arc<dyn RecordStore>) -> Result<Self> {
        let name = name.into();
        if !store.has_namespace(&name) {
            return Err(HistoryError::NoHistory { name });
        }
        let keys = store.list(&name)?;
        if keys.is_empty() {
            return Err(HistoryError::NoHistory { name });
        }
        tracing::debug!(logpose = %name, records = keys.len(), "history opened");
        Ok(Self { name, store, keys })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record keys in chronological order.
    pub fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn latest_key(&self) -> Option<&RecordKey> {
        self.keys.last()
    }

    /// `None` is the latest record. A trailing `.json` is accepted so file names work as keys.
    fn resolve(&self, key: Option<&str>) -> Result<RecordKey> {
        let not_found = |raw: &str| LogposeError::NotFound {
            session: self.name.clone(),
            key: raw.to_string(),
        };
        match key {
            None => self.latest_key().cloned().ok_or_else(|| not_found("latest").into()),
            Some(raw) => {
                let trimmed = raw.strip_suffix(".json").unwrap_or(raw);
                RecordKey::parse(trimmed).ok_or_else(|| not_found(raw).into())
            }
        }
    }

    /// Loads one record; `None` loads the latest.
    pub fn load(&self, key: Option<&str>) -> Result<Record> {
        let key = self.resolve(key)?;
        Ok(self.store.read(&self.name, &key)?)
    }

    /// Loads one record as its session summary and a route-per-row table.
    pub fn load_table(&self, key: Option<&str>) -> Result<(SessionSummary, DataFrame)> {
        let record = self.load(key)?;
        let table = record_table(&record)?;
        Ok((record.session, table))
    }

    /// Every snapshotted record, oldest first.
    pub fn compare(&self) -> Result<Vec<Record>> {
        self.keys
            .iter()
            .map(|key| self.store.read(&self.name, key).map_err(HistoryError::from))
            .collect()
    }

    /// Every record side by side. All records must have the same set of routes.
    pub fn compare_table(&self) -> Result<ComparisonTable> {
        let records = self.compare()?;
        check_schema(&self.keys, &records)?;
        Ok(ComparisonTable::build(&self.keys, &records)?)
    }
}

/// Route-name sets must match the first record's; order does not matter.
fn check_schema(keys: &[RecordKey], records: &[Record]) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let expected: BTreeSet<&str> = first.route_names().collect();
    for (key, record) in keys.iter().zip(records) {
        let found: BTreeSet<&str> = record.route_names().collect();
        if found != expected {
            return Err(HistoryError::SchemaMismatch {
                key: key.to_string(),
                expected: expected.iter().map(|s| s.to_string()).collect(),
                found: found.iter().map(|s| s.to_string()).collect(),
            });
        }
    }
    Ok(())
}

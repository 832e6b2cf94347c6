//! Record persistence. [`JsonDirStore`] keeps one directory per logpose name and one
//! pretty-printed JSON document per run.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use crate::error::{LogposeError, Result};
use crate::record::{Record, RecordKey};

const EXTENSION: &str = "json";
pub(crate) const MAX_DISAMBIGUATORS: u32 = 1_000;

/// Record store abstraction. Implement and pass to
/// [`Logpose::with_store`](crate::Logpose::with_store) to persist somewhere else.
pub trait RecordStore: Send + Sync {
    /// Persists `record` under a fresh key in the `session` namespace. Never overwrites.
    fn write(&self, session: &str, record: &Record) -> Result<RecordKey>;

    fn read(&self, session: &str, key: &RecordKey) -> Result<Record>;

    /// All keys of the namespace in ascending (chronological) order.
    fn list(&self, session: &str) -> Result<Vec<RecordKey>>;

    fn has_namespace(&self, session: &str) -> bool;
}

/// Rejects names that would escape the root when used as a directory.
pub fn validate_session_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(LogposeError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Filesystem store: `<root>/<session>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace_dir(&self, session: &str) -> PathBuf {
        self.root.join(session)
    }

    pub fn record_path(&self, session: &str, key: &RecordKey) -> PathBuf {
        self.namespace_dir(session)
            .join(format!("{}.{EXTENSION}", key.as_str()))
    }

    /// Writes `record` under `base`, or under `base_1`, `base_2`, ... when those files exist.
    pub fn write_at(&self, session: &str, record: &Record, base: RecordKey) -> Result<RecordKey> {
        validate_session_name(session)?;
        let dir = self.namespace_dir(session);
        std::fs::create_dir_all(&dir).map_err(|e| LogposeError::storage(&dir, e))?;
        let content = serde_json::to_string_pretty(record)?;

        for n in 0..=MAX_DISAMBIGUATORS {
            let key = if n == 0 { base.clone() } else { base.with_suffix(n) };
            let path = self.record_path(session, &key);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = file
                        .write_all(content.as_bytes())
                        .and_then(|()| file.write_all(b"\n"))
                    {
                        // A half-written document would later read back as malformed.
                        let _ = std::fs::remove_file(&path);
                        return Err(LogposeError::storage(&path, e));
                    }
                    tracing::debug!(session, key = %key, path = %path.display(), "record written");
                    return Ok(key);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(session, key = %key, "record key collision");
                }
                Err(e) => return Err(LogposeError::storage(&path, e)),
            }
        }
        Err(LogposeError::storage(
            self.record_path(session, &base.with_suffix(MAX_DISAMBIGUATORS)),
            std::io::Error::new(ErrorKind::AlreadyExists, "no free record key"),
        ))
    }
}

impl RecordStore for JsonDirStore {
    fn write(&self, session: &str, record: &Record) -> Result<RecordKey> {
        self.write_at(session, record, RecordKey::now())
    }

    fn read(&self, session: &str, key: &RecordKey) -> Result<Record> {
        validate_session_name(session)?;
        let path = self.record_path(session, key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LogposeError::NotFound {
                    session: session.to_string(),
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(LogposeError::storage(&path, e)),
        };
        let document: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| LogposeError::malformed(&path, e.to_string()))?;
        Record::from_document(document).map_err(|reason| LogposeError::malformed(&path, reason))
    }

    fn list(&self, session: &str) -> Result<Vec<RecordKey>> {
        validate_session_name(session)?;
        let dir = self.namespace_dir(session);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogposeError::storage(&dir, e)),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| LogposeError::storage(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).and_then(RecordKey::parse) {
                Some(key) => keys.push(key),
                None => {
                    tracing::debug!(path = %path.display(), "skipping file without a record key")
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn has_namespace(&self, session: &str) -> bool {
        validate_session_name(session).is_ok() && self.namespace_dir(session).is_dir()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory store with an optional injected write failure.
    #[derive(Default)]
    pub struct MemoryStore {
        records: Mutex<BTreeMap<(String, RecordKey), Record>>,
        fail_writes: Mutex<bool>,
        counter: Mutex<u32>,
    }

    impl MemoryStore {
        pub fn fail_writes(&self, fail: bool) {
            *self.fail_writes.lock().unwrap() = fail;
        }

        pub fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        pub fn only(&self) -> Record {
            let records = self.records.lock().unwrap();
            assert_eq!(records.len(), 1, "expected exactly one record");
            records.values().next().cloned().unwrap()
        }
    }

    impl RecordStore for MemoryStore {
        fn write(&self, session: &str, record: &Record) -> Result<RecordKey> {
            if *self.fail_writes.lock().unwrap() {
                return Err(LogposeError::storage(
                    session,
                    std::io::Error::new(ErrorKind::StorageFull, "disk full"),
                ));
            }
            let mut counter = self.counter.lock().unwrap();
            *counter += 1;
            let key = RecordKey::parse(&format!("20240101_000000{:06}", *counter)).unwrap();
            self.records
                .lock()
                .unwrap()
                .insert((session.to_string(), key.clone()), record.clone());
            Ok(key)
        }

        fn read(&self, session: &str, key: &RecordKey) -> Result<Record> {
            self.records
                .lock()
                .unwrap()
                .get(&(session.to_string(), key.clone()))
                .cloned()
                .ok_or_else(|| LogposeError::NotFound {
                    session: session.to_string(),
                    key: key.to_string(),
                })
        }

        fn list(&self, session: &str) -> Result<Vec<RecordKey>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .keys()
                .filter(|(s, _)| s == session)
                .map(|(_, k)| k.clone())
                .collect())
        }

        fn has_namespace(&self, session: &str) -> bool {
            self.records.lock().unwrap().keys().any(|(s, _)| s == session)
        }
    }
}

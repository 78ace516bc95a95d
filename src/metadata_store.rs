use crate::document::{Document, DocumentStatus, Signature};
use crate::Error;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Durable record of documents, keyed by `(user_id, filename)`.
pub trait MetadataStore: Send + Sync {
    /// Fails when a record with the same `(user_id, filename)` already exists.
    fn create(&self, record: Document) -> Result<Document, Error>;

    fn find_one(&self, user_id: &str, filename: &str) -> Result<Option<Document>, Error>;

    /// Newest upload first.
    fn find_all_by_user(&self, user_id: &str) -> Result<Vec<Document>, Error>;

    /// Returns `false` when there was nothing to delete.
    fn delete_one(&self, user_id: &str, filename: &str) -> Result<bool, Error>;

    /// Mark the record as signed, replacing any earlier signature.
    fn update_status_and_signature(
        &self,
        record: &Document,
        signature: Signature,
    ) -> Result<Document, Error>;
}

type RecordKey = (String, String);

fn key_of(user_id: &str, filename: &str) -> RecordKey {
    (user_id.to_owned(), filename.to_owned())
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Error> {
    mutex
        .lock()
        .map_err(|_| Error::StorageFailure("metadata store lock poisoned".to_owned()))
}

fn sorted_newest_first(mut records: Vec<Document>) -> Vec<Document> {
    records.sort_by(|a, b| b.date_uploaded.cmp(&a.date_uploaded));
    records
}

fn apply_signature(
    records: &mut HashMap<RecordKey, Document>,
    record: &Document,
    signature: Signature,
) -> Result<Document, Error> {
    let stored = records
        .get_mut(&key_of(&record.user_id, &record.filename))
        .ok_or_else(|| Error::NotFound("Document not found".to_owned()))?;
    stored.status = DocumentStatus::Signed;
    stored.signature = Some(signature);
    Ok(stored.clone())
}

fn insert_new(records: &mut HashMap<RecordKey, Document>, record: Document) -> Result<Document, Error> {
    let key = key_of(&record.user_id, &record.filename);
    if records.contains_key(&key) {
        return Err(Error::StorageFailure(format!(
            "document `{}` already exists",
            record.filename
        )));
    }
    records.insert(key, record.clone());
    Ok(record)
}

/// Keeps all records in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<HashMap<RecordKey, Document>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn create(&self, record: Document) -> Result<Document, Error> {
        insert_new(&mut *lock(&self.records)?, record)
    }

    fn find_one(&self, user_id: &str, filename: &str) -> Result<Option<Document>, Error> {
        Ok(lock(&self.records)?.get(&key_of(user_id, filename)).cloned())
    }

    fn find_all_by_user(&self, user_id: &str) -> Result<Vec<Document>, Error> {
        let records = lock(&self.records)?
            .values()
            .filter(|doc| doc.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_newest_first(records))
    }

    fn delete_one(&self, user_id: &str, filename: &str) -> Result<bool, Error> {
        Ok(lock(&self.records)?
            .remove(&key_of(user_id, filename))
            .is_some())
    }

    fn update_status_and_signature(
        &self,
        record: &Document,
        signature: Signature,
    ) -> Result<Document, Error> {
        apply_signature(&mut *lock(&self.records)?, record, signature)
    }
}

/// Keeps all records in a single JSON file. Every change rewrites the file through
/// a temporary file and a rename, so a crash leaves either the old or the new state.
///
/// The file is read again for every operation, so processes sharing it see each
/// other's changes. Writes from different processes are not locked against each
/// other: a change landing between another process' read and rename is lost.
#[derive(Debug)]
pub struct JsonFileMetadataStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl JsonFileMetadataStore {
    /// Open the store, starting empty when the file does not exist yet.
    /// Fails when the file exists but is not a valid record list.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let store = JsonFileMetadataStore {
            path: path.into(),
            guard: Mutex::new(()),
        };
        let records = store.load()?;
        log::debug!(
            "Opened metadata store {:?} with {} record(s).",
            store.path,
            records.len()
        );
        Ok(store)
    }

    fn load(&self) -> Result<HashMap<RecordKey, Document>, Error> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };
        let list: Vec<Document> = serde_json::from_slice(&data)?;
        Ok(list
            .into_iter()
            .map(|doc| (key_of(&doc.user_id, &doc.filename), doc))
            .collect())
    }

    fn persist(&self, records: &HashMap<RecordKey, Document>) -> Result<(), Error> {
        let mut list: Vec<&Document> = records.values().collect();
        list.sort_by(|a, b| {
            (a.user_id.as_str(), a.filename.as_str()).cmp(&(b.user_id.as_str(), b.filename.as_str()))
        });
        let data = serde_json::to_vec_pretty(&list)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn read<T>(&self, query: impl FnOnce(&HashMap<RecordKey, Document>) -> T) -> Result<T, Error> {
        let _guard = lock(&self.guard)?;
        Ok(query(&self.load()?))
    }

    /// Apply `change` to the current file content and write it back.
    /// Nothing is written when `change` fails.
    fn modify<T>(
        &self,
        change: impl FnOnce(&mut HashMap<RecordKey, Document>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let _guard = lock(&self.guard)?;
        let mut records = self.load()?;
        let result = change(&mut records)?;
        self.persist(&records)?;
        Ok(result)
    }
}

impl MetadataStore for JsonFileMetadataStore {
    fn create(&self, record: Document) -> Result<Document, Error> {
        self.modify(|records| insert_new(records, record))
    }

    fn find_one(&self, user_id: &str, filename: &str) -> Result<Option<Document>, Error> {
        self.read(|records| records.get(&key_of(user_id, filename)).cloned())
    }

    fn find_all_by_user(&self, user_id: &str) -> Result<Vec<Document>, Error> {
        let records = self.read(|records| {
            records
                .values()
                .filter(|doc| doc.user_id == user_id)
                .cloned()
                .collect()
        })?;
        Ok(sorted_newest_first(records))
    }

    fn delete_one(&self, user_id: &str, filename: &str) -> Result<bool, Error> {
        let key = key_of(user_id, filename);
        let _guard = lock(&self.guard)?;
        let mut records = self.load()?;
        if records.remove(&key).is_none() {
            return Ok(false);
        }
        self.persist(&records)?;
        Ok(true)
    }

    fn update_status_and_signature(
        &self,
        record: &Document,
        signature: Signature,
    ) -> Result<Document, Error> {
        self.modify(|records| apply_signature(records, record, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(user: &str, filename: &str, offset_secs: i64) -> Document {
        let uploaded = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(offset_secs);
        Document::new_pending(user, filename, "orig.pdf", 128, uploaded)
    }

    fn signature(text: &str) -> Signature {
        Signature {
            text: text.to_owned(),
            font: Some("Serif".to_owned()),
            x: 1.0,
            y: 2.0,
            page: 0,
            signed_at: Utc.timestamp_opt(1_700_000_500, 0).unwrap(),
        }
    }

    fn exercise_store(store: &dyn MetadataStore) {
        store.create(record("alice", "a.pdf", 0)).unwrap();
        store.create(record("alice", "b.pdf", 60)).unwrap();
        store.create(record("alice", "c.pdf", 30)).unwrap();
        store.create(record("bob", "a.pdf", 90)).unwrap();
        assert!(store.create(record("alice", "a.pdf", 5)).is_err());

        let listed: Vec<String> = store
            .find_all_by_user("alice")
            .unwrap()
            .into_iter()
            .map(|doc| doc.filename)
            .collect();
        assert_eq!(listed, vec!["b.pdf", "c.pdf", "a.pdf"]);
        assert!(store.find_all_by_user("nobody").unwrap().is_empty());

        // Same filename for another user is a different document.
        let bobs = store.find_one("bob", "a.pdf").unwrap().unwrap();
        assert_eq!(bobs.user_id, "bob");
        assert!(store.find_one("bob", "b.pdf").unwrap().is_none());

        let alices = store.find_one("alice", "a.pdf").unwrap().unwrap();
        let signed = store
            .update_status_and_signature(&alices, signature("first"))
            .unwrap();
        assert_eq!(signed.status, DocumentStatus::Signed);
        store
            .update_status_and_signature(&alices, signature("second"))
            .unwrap();
        let reread = store.find_one("alice", "a.pdf").unwrap().unwrap();
        assert_eq!(reread.signature.unwrap().text, "second");
        assert_eq!(
            store.find_one("bob", "a.pdf").unwrap().unwrap().status,
            DocumentStatus::Pending
        );

        assert!(store.delete_one("alice", "a.pdf").unwrap());
        assert!(!store.delete_one("alice", "a.pdf").unwrap());
        assert!(store.find_one("alice", "a.pdf").unwrap().is_none());
        assert!(store.find_one("bob", "a.pdf").unwrap().is_some());
    }

    #[test]
    fn in_memory_store() {
        exercise_store(&InMemoryMetadataStore::new());
    }

    #[test]
    fn json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        exercise_store(&JsonFileMetadataStore::open(dir.path().join("meta/documents.json")).unwrap());
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        {
            let store = JsonFileMetadataStore::open(&path).unwrap();
            let doc = store.create(record("alice", "a.pdf", 0)).unwrap();
            store
                .update_status_and_signature(&doc, signature("kept"))
                .unwrap();
        }
        let store = JsonFileMetadataStore::open(&path).unwrap();
        let doc = store.find_one("alice", "a.pdf").unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Signed);
        assert_eq!(doc.signature.unwrap().text, "kept");
    }

    #[test]
    fn json_file_store_handles_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let first = JsonFileMetadataStore::open(&path).unwrap();
        let second = JsonFileMetadataStore::open(&path).unwrap();

        first.create(record("alice", "a.pdf", 0)).unwrap();
        second.create(record("bob", "b.pdf", 10)).unwrap();

        // Neither handle drops the record the other one wrote.
        assert!(first.find_one("bob", "b.pdf").unwrap().is_some());
        assert!(second.find_one("alice", "a.pdf").unwrap().is_some());
        assert!(second.create(record("alice", "a.pdf", 20)).is_err());

        assert!(second.delete_one("alice", "a.pdf").unwrap());
        assert!(first.find_one("alice", "a.pdf").unwrap().is_none());
        assert_eq!(first.find_all_by_user("bob").unwrap().len(), 1);
    }

    #[test]
    fn signing_unknown_record_fails() {
        let store = InMemoryMetadataStore::new();
        let err = store
            .update_status_and_signature(&record("alice", "ghost.pdf", 0), signature("x"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

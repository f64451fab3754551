//! In-memory corpus store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{Record, RecordId};
use super::CorpusStore;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// A record with this id already exists.
    #[error("Record already exists: {0}")]
    DuplicateId(RecordId),
}

#[derive(Debug, Default)]
struct Inner {
    /// Records in insertion order.
    records: Vec<Record>,
    /// Id -> position in `records`.
    index: HashMap<RecordId, usize>,
}

/// In-memory corpus.
///
/// A single `RwLock` guards records and index together, so appends and
/// per-record updates are atomic and readers always see a consistent corpus.
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    inner: RwLock<Inner>,
}

impl InMemoryCorpus {
    /// Create a new empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a corpus pre-loaded with records (e.g. a seed data set).
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Result<Self, InMemoryError> {
        let corpus = Self::new();
        for record in records {
            corpus.append(record)?;
        }
        Ok(corpus)
    }
}

impl CorpusStore for InMemoryCorpus {
    type Error = InMemoryError;

    fn append(&self, record: Record) -> Result<(), Self::Error> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&record.id) {
            return Err(InMemoryError::DuplicateId(record.id));
        }
        let position = inner.records.len();
        inner.index.insert(record.id, position);
        inner.records.push(record);
        Ok(())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Record>, Self::Error> {
        let inner = self.inner.read();
        Ok(inner.index.get(id).map(|&i| inner.records[i].clone()))
    }

    fn snapshot(&self) -> Result<Vec<Record>, Self::Error> {
        Ok(self.inner.read().records.clone())
    }

    fn query(&self, predicate: &dyn Fn(&Record) -> bool) -> Result<Vec<Record>, Self::Error> {
        Ok(self
            .inner
            .read()
            .records
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    fn update<T>(
        &self,
        id: &RecordId,
        f: impl FnOnce(&mut Record) -> T,
    ) -> Result<Option<T>, Self::Error> {
        let mut inner = self.inner.write();
        let Some(&position) = inner.index.get(id) else {
            return Ok(None);
        };
        Ok(Some(f(&mut inner.records[position])))
    }

    fn len(&self) -> Result<usize, Self::Error> {
        Ok(self.inner.read().records.len())
    }
}

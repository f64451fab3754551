//! Corpus storage backends.

pub mod memory;
pub mod query;

use crate::types::{Record, RecordId};

/// Trait for corpus storage backends.
///
/// Records are appended once and never deleted. Implementations must make each
/// `append` and `update` atomic with respect to concurrent readers and writers,
/// and must return query results in insertion order.
pub trait CorpusStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append a new record. Fails if the id already exists.
    fn append(&self, record: Record) -> Result<(), Self::Error>;

    /// Fetch a record by id.
    fn get(&self, id: &RecordId) -> Result<Option<Record>, Self::Error>;

    /// All records, in insertion order.
    fn snapshot(&self) -> Result<Vec<Record>, Self::Error>;

    /// Records matching a predicate, in insertion order.
    fn query(&self, predicate: &dyn Fn(&Record) -> bool) -> Result<Vec<Record>, Self::Error>;

    /// Mutate a single record in place under the store's write lock.
    ///
    /// Returns `Ok(None)` if the record does not exist. The closure's result is
    /// passed through; a closure that refuses a change must leave the record
    /// untouched.
    fn update<T>(
        &self,
        id: &RecordId,
        f: impl FnOnce(&mut Record) -> T,
    ) -> Result<Option<T>, Self::Error>;

    /// Number of records.
    fn len(&self) -> Result<usize, Self::Error>;

    /// Whether the corpus is empty.
    fn is_empty(&self) -> Result<bool, Self::Error> {
        Ok(self.len()? == 0)
    }
}

pub use memory::{InMemoryCorpus, InMemoryError};
pub use query::CorpusQuery;

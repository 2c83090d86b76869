//! In-memory index for testing and ephemeral use.
//!
//! [`InMemoryNamedIndex`] keeps all records in a `BTreeMap` keyed by id and
//! protected by a `RwLock`. Data is lost when the index is dropped.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use drift_types::ContentHash;

use crate::error::{IndexError, IndexResult};
use crate::names::validate_name;
use crate::traits::NamedIndex;
use crate::types::{IndexRecord, Namespace};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    records: BTreeMap<i64, IndexRecord>,
}

impl State {
    fn named<'a>(
        &'a self,
        namespace: Namespace,
        name: &'a str,
    ) -> impl Iterator<Item = &'a IndexRecord> + 'a {
        self.records
            .values()
            .filter(move |r| r.namespace == namespace && r.name == name)
    }
}

/// An in-memory implementation of [`NamedIndex`].
#[derive(Debug, Default)]
pub struct InMemoryNamedIndex {
    state: RwLock<State>,
}

impl InMemoryNamedIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> IndexError {
    IndexError::LockPoisoned(e.to_string())
}

impl NamedIndex for InMemoryNamedIndex {
    fn register(
        &self,
        namespace: Namespace,
        name: &str,
        hash: ContentHash,
    ) -> IndexResult<IndexRecord> {
        validate_name(namespace, name)?;

        let mut state = self.state.write().map_err(poisoned)?;
        if namespace == Namespace::Session && state.named(namespace, name).next().is_some() {
            return Err(IndexError::Conflict {
                namespace,
                name: name.to_string(),
            });
        }

        state.next_id += 1;
        let record = IndexRecord {
            id: state.next_id,
            namespace,
            name: name.to_string(),
            hash,
        };
        state.records.insert(record.id, record.clone());
        debug!(%namespace, name, hash = %hash.short_hex(), "registered name");
        Ok(record)
    }

    fn record(&self, namespace: Namespace, name: &str) -> IndexResult<Option<IndexRecord>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.named(namespace, name).last().cloned())
    }

    fn unregister(&self, namespace: Namespace, name: &str) -> IndexResult<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        let ids: Vec<i64> = state.named(namespace, name).map(|r| r.id).collect();
        if ids.is_empty() {
            warn!(%namespace, name, "no such name in the index");
            return Ok(false);
        }
        for id in ids {
            state.records.remove(&id);
        }
        Ok(true)
    }

    fn list(&self, namespace: Namespace) -> IndexResult<Vec<IndexRecord>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .records
            .values()
            .filter(|r| r.namespace == namespace)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(seed: &[u8]) -> ContentHash {
        ContentHash::of(seed)
    }

    #[test]
    fn register_and_resolve() {
        let index = InMemoryNamedIndex::new();
        let record = index.register(Namespace::Session, "castles", hash(b"a")).unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(
            index.resolve(Namespace::Session, "castles").unwrap(),
            Some(hash(b"a"))
        );
    }

    #[test]
    fn duplicate_name_conflicts_and_leaves_state() {
        let index = InMemoryNamedIndex::new();
        index.register(Namespace::Session, "dup", hash(b"first")).unwrap();
        let err = index
            .register(Namespace::Session, "dup", hash(b"second"))
            .unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
        assert_eq!(
            index.resolve(Namespace::Session, "dup").unwrap(),
            Some(hash(b"first"))
        );
        assert_eq!(index.list(Namespace::Session).unwrap().len(), 1);
    }

    #[test]
    fn repeated_query_names_append_records() {
        let index = InMemoryNamedIndex::new();
        index.register(Namespace::Query, "fox", hash(b"one")).unwrap();
        index.register(Namespace::Query, "fox", hash(b"two")).unwrap();

        let records = index.list(Namespace::Query).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(index.resolve(Namespace::Query, "fox").unwrap(), Some(hash(b"two")));
        assert_eq!(
            index
                .record_for(Namespace::Query, "fox", hash(b"one"))
                .unwrap()
                .map(|r| r.id),
            Some(records[0].id)
        );
        assert!(index
            .record_for(Namespace::Query, "fox", hash(b"three"))
            .unwrap()
            .is_none());

        assert!(index.unregister(Namespace::Query, "fox").unwrap());
        assert!(index.list(Namespace::Query).unwrap().is_empty());
    }

    #[test]
    fn namespaces_are_independent() {
        let index = InMemoryNamedIndex::new();
        index.register(Namespace::Query, "fox", hash(b"q")).unwrap();
        index.register(Namespace::Session, "fox", hash(b"s")).unwrap();
        assert_eq!(index.resolve(Namespace::Query, "fox").unwrap(), Some(hash(b"q")));
        assert_eq!(index.resolve(Namespace::Session, "fox").unwrap(), Some(hash(b"s")));
    }

    #[test]
    fn unregister_missing_is_noop() {
        let index = InMemoryNamedIndex::new();
        assert!(!index.unregister(Namespace::Session, "ghost").unwrap());
    }

    #[test]
    fn unregister_frees_the_name() {
        let index = InMemoryNamedIndex::new();
        index.register(Namespace::Session, "tmp", hash(b"1")).unwrap();
        assert!(index.unregister(Namespace::Session, "tmp").unwrap());
        assert!(index.resolve(Namespace::Session, "tmp").unwrap().is_none());
        index.register(Namespace::Session, "tmp", hash(b"2")).unwrap();
    }

    #[test]
    fn list_and_record_at_follow_registration_order() {
        let index = InMemoryNamedIndex::new();
        index.register(Namespace::Query, "zebra", hash(b"z")).unwrap();
        index.register(Namespace::Query, "apple", hash(b"a")).unwrap();
        let names: Vec<String> = index
            .list(Namespace::Query)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["zebra", "apple"]);
        assert_eq!(
            index.record_at(Namespace::Query, 1).unwrap().map(|r| r.hash),
            Some(hash(b"a"))
        );
        assert!(index.record_at(Namespace::Query, 2).unwrap().is_none());
    }

    #[test]
    fn invalid_name_is_rejected() {
        let index = InMemoryNamedIndex::new();
        assert!(matches!(
            index.register(Namespace::Session, "", hash(b"x")),
            Err(IndexError::InvalidName { .. })
        ));
    }
}

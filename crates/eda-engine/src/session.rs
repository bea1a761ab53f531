//! In-process session store.
//!
//! Holds one [`Dataset`] per session together with the last bundle computed
//! for it. Callers pass the [`SessionId`] explicitly; nothing in the engine
//! reaches into a store on its own.

use crate::bundle::{StatisticsBundle, StatisticsEngine};
use crate::cleaner::{CleaningOutcome, CleaningRequest, DataCleaner};
use crate::dataset::{DataPreview, Dataset};
use crate::error::{EngineError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

struct SessionEntry {
    dataset: Dataset,
    /// Bumped on every clean or replace, including replacements whose
    /// dataset revision starts over at 0.
    generation: u64,
    /// Dropped whenever the dataset changes.
    bundle: Option<Arc<StatisticsBundle>>,
}

pub struct SessionStore {
    engine: StatisticsEngine,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    next_id: AtomicU64,
}

static_assertions::assert_impl_all!(SessionStore: Send, Sync);
static_assertions::assert_impl_all!(Dataset: Send, Sync);
static_assertions::assert_impl_all!(StatisticsBundle: Send, Sync);

fn missing(id: SessionId) -> EngineError {
    EngineError::MissingDataset(id.to_string())
}

impl SessionStore {
    pub fn new(engine: StatisticsEngine) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn engine(&self) -> &StatisticsEngine {
        &self.engine
    }

    /// Store a dataset under a fresh session id.
    pub fn insert(&self, dataset: Dataset) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("Opened {} with shape {:?}", id, dataset.shape());
        self.sessions.write().insert(
            id,
            SessionEntry {
                dataset,
                generation: 0,
                bundle: None,
            },
        );
        id
    }

    /// Swap the dataset of an existing session, dropping its cached bundle.
    pub fn replace(&self, id: SessionId, dataset: Dataset) -> Result<()> {
        let mut sessions = self.sessions.write();
        let entry = sessions.get_mut(&id).ok_or_else(|| missing(id))?;
        entry.dataset = dataset;
        entry.generation += 1;
        entry.bundle = None;
        Ok(())
    }

    /// Close a session, handing back its dataset.
    pub fn remove(&self, id: SessionId) -> Result<Dataset> {
        self.sessions
            .write()
            .remove(&id)
            .map(|entry| entry.dataset)
            .ok_or_else(|| missing(id))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Run `f` against the session's dataset.
    pub fn with_dataset<R>(&self, id: SessionId, f: impl FnOnce(&Dataset) -> R) -> Result<R> {
        let sessions = self.sessions.read();
        let entry = sessions.get(&id).ok_or_else(|| missing(id))?;
        Ok(f(&entry.dataset))
    }

    /// Statistics for the session's current dataset, computed at most once
    /// per revision.
    ///
    /// The analysis runs on a snapshot outside the lock, so other sessions
    /// and readers are never blocked by it.
    pub fn analyze(&self, id: SessionId) -> Result<Arc<StatisticsBundle>> {
        let (snapshot, generation) = {
            let sessions = self.sessions.read();
            let entry = sessions.get(&id).ok_or_else(|| missing(id))?;
            if let Some(bundle) = &entry.bundle
                && bundle.is_current_for(&entry.dataset)
            {
                debug!("Using cached statistics for {}", id);
                return Ok(Arc::clone(bundle));
            }
            (entry.dataset.clone(), entry.generation)
        };

        let bundle = Arc::new(self.engine.analyze(&snapshot)?);
        self.store_bundle(id, generation, bundle)
    }

    /// Cache `bundle` unless the session changed since `generation`.
    ///
    /// A bundle cached meanwhile by another caller for the same generation
    /// wins, so every caller sees the same `Arc`.
    fn store_bundle(
        &self,
        id: SessionId,
        generation: u64,
        bundle: Arc<StatisticsBundle>,
    ) -> Result<Arc<StatisticsBundle>> {
        let mut sessions = self.sessions.write();
        let entry = sessions.get_mut(&id).ok_or_else(|| missing(id))?;
        if entry.generation != generation {
            debug!("{} changed during analysis, not caching", id);
            return Ok(bundle);
        }
        if let Some(existing) = &entry.bundle
            && existing.is_current_for(&entry.dataset)
        {
            return Ok(Arc::clone(existing));
        }
        entry.bundle = Some(Arc::clone(&bundle));
        Ok(bundle)
    }

    /// Apply a cleaning action to the session's dataset.
    pub fn clean(&self, id: SessionId, request: &CleaningRequest) -> Result<CleaningOutcome> {
        let mut sessions = self.sessions.write();
        let entry = sessions.get_mut(&id).ok_or_else(|| missing(id))?;
        let outcome = DataCleaner::apply(&mut entry.dataset, request, self.engine.config())?;
        entry.generation += 1;
        entry.bundle = None;
        Ok(outcome)
    }

    /// Raw values of one column, for chart rendering.
    pub fn column_values(&self, id: SessionId, column: &str) -> Result<Vec<Value>> {
        self.with_dataset(id, |ds| ds.column_values(column))?
    }

    pub fn preview(&self, id: SessionId, rows: usize) -> Result<DataPreview> {
        self.with_dataset(id, |ds| ds.preview(rows))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StatisticsEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::CleaningAction;
    use polars::prelude::*;
    use serde_json::json;

    fn dataset() -> Dataset {
        Dataset::new(
            df!(
                "a" => &[1i64, 1, 2, 3, 5],
                "b" => &["x", "x", "y", "z", "y"]
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_session_is_missing_dataset() {
        let store = SessionStore::default();
        let err = store.analyze(SessionId(42)).unwrap_err();
        assert!(matches!(err, EngineError::MissingDataset(_)));
        assert_eq!(err.error_code(), "MISSING_DATASET");
    }

    #[test]
    fn test_analyze_is_cached_until_clean() {
        let store = SessionStore::default();
        let id = store.insert(dataset());

        let first = store.analyze(id).unwrap();
        let second = store.analyze(id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let outcome = store
            .clean(id, &CleaningRequest::new(CleaningAction::DropDuplicates))
            .unwrap();
        assert_eq!(outcome.shape, (4, 2));

        let third = store.analyze(id).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.dataset_revision, 1);
        assert_eq!(third.profile.shape, (4, 2));
    }

    #[test]
    fn test_bundle_from_older_generation_is_not_cached() {
        let store = SessionStore::default();
        let id = store.insert(dataset());
        let stale = Arc::new(store.engine().analyze(&dataset()).unwrap());

        store
            .clean(id, &CleaningRequest::new(CleaningAction::DropDuplicates))
            .unwrap();
        let returned = store.store_bundle(id, 0, Arc::clone(&stale)).unwrap();
        assert!(Arc::ptr_eq(&returned, &stale));

        let fresh = store.analyze(id).unwrap();
        assert!(!Arc::ptr_eq(&fresh, &stale));
        assert_eq!(fresh.profile.shape, (4, 2));
    }

    #[test]
    fn test_replace_with_fresh_dataset_discards_pending_bundle() {
        let store = SessionStore::default();
        let id = store.insert(dataset());
        let stale = Arc::new(store.engine().analyze(&dataset()).unwrap());

        // same revision (0) as the bundle, but a different dataset
        let small = Dataset::new(df!("z" => &[1.0f64, 2.0]).unwrap()).unwrap();
        store.replace(id, small).unwrap();
        store.store_bundle(id, 0, stale).unwrap();

        assert_eq!(store.analyze(id).unwrap().profile.shape, (2, 1));
    }

    #[test]
    fn test_concurrent_analyze_and_clean() {
        let store = SessionStore::default();
        let id = store.insert(dataset());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| store.analyze(id).unwrap());
            }
            scope.spawn(|| {
                store
                    .clean(id, &CleaningRequest::new(CleaningAction::DropDuplicates))
                    .unwrap()
            });
        });

        let bundle = store.analyze(id).unwrap();
        assert_eq!(bundle.profile.shape, (4, 2));
        assert!(Arc::ptr_eq(&bundle, &store.analyze(id).unwrap()));
    }

    #[test]
    fn test_column_values_and_preview() {
        let store = SessionStore::default();
        let id = store.insert(dataset());
        assert_eq!(store.column_values(id, "b").unwrap()[2], json!("y"));
        assert!(matches!(
            store.column_values(id, "nope"),
            Err(EngineError::ColumnNotFound(_))
        ));
        assert_eq!(store.preview(id, 2).unwrap().head["a"].len(), 2);
    }

    #[test]
    fn test_replace_and_remove() {
        let store = SessionStore::default();
        let id = store.insert(dataset());
        let other = store.insert(dataset());
        assert_ne!(id, other);
        assert_eq!(store.len(), 2);

        let small = Dataset::new(df!("z" => &[1.0f64]).unwrap()).unwrap();
        store.replace(id, small).unwrap();
        assert_eq!(store.with_dataset(id, |ds| ds.shape()).unwrap(), (1, 1));

        store.remove(id).unwrap();
        assert!(!store.contains(id));
        assert!(store.remove(id).is_err());
        assert!(store.contains(other));
    }
}

//! Catalog + user store lifecycle and the three chat operations.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use gobble::{
    build_history, Catalog, CatalogReader, DecisionEffect, Outcome, SelectionEngine,
    SelectionStrategy,
};

use super::presentation::Presentation;
use crate::store::UserStore;
use crate::types::{McpError, McpResult};

/// Knobs for selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub strategy: SelectionStrategy,
    /// Fixed RNG seed for reproducible selection.
    pub seed: Option<u64>,
}

/// Summary of one user's progress.
#[derive(Debug, Clone, Serialize)]
pub struct UserStatus {
    pub user_id: i64,
    pub saved: usize,
    pub catalog_size: usize,
    pub exhausted: bool,
    pub last_shown: Option<usize>,
    pub created_at: String,
}

/// Owns the shared catalog and the user store, and runs start/decide/history.
pub struct GobbleSessionManager {
    catalog: Arc<Catalog>,
    store: UserStore,
    engine: SelectionEngine,
    rng: StdRng,
    /// Entries each user discarded in the current cycle. Not persisted.
    passed: HashMap<i64, HashSet<usize>>,
    catalog_path: PathBuf,
}

impl GobbleSessionManager {
    /// Open the catalog and user store at the given paths.
    ///
    /// A missing catalog is an error: ingest must run first.
    pub fn open(catalog_path: &str, users_path: &str, options: SessionOptions) -> McpResult<Self> {
        let catalog_file = PathBuf::from(catalog_path);
        if !catalog_file.exists() {
            return Err(McpError::CatalogNotFound(catalog_path.to_string()));
        }

        tracing::info!("Opening catalog: {}", catalog_file.display());
        let catalog = CatalogReader::read_from_file(&catalog_file)
            .map_err(|e| McpError::Catalog(format!("Failed to read catalog: {e}")))?;

        tracing::info!("Opening user store: {users_path}");
        let store = UserStore::open(Path::new(users_path))?;

        let mut session = Self::with_parts(catalog, store, options);
        session.catalog_path = catalog_file;
        Ok(session)
    }

    /// Build a session from an already loaded catalog and store.
    pub fn with_parts(catalog: Catalog, store: UserStore, options: SessionOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(
            "Session ready: {} entries, {:?} selection",
            catalog.len(),
            options.strategy
        );

        Self {
            catalog: Arc::new(catalog),
            store,
            engine: SelectionEngine::new(options.strategy),
            rng,
            passed: HashMap::new(),
            catalog_path: PathBuf::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    /// First contact: create the user if needed and present an entry.
    pub fn start(&mut self, user_id: i64) -> McpResult<Presentation> {
        self.advance(user_id, None)
    }

    /// Record `outcome` for `index` (or the last shown entry) and present the next one.
    ///
    /// An invalid reference fails before anything is written.
    pub fn decide(
        &mut self,
        user_id: i64,
        index: Option<usize>,
        outcome: Outcome,
    ) -> McpResult<Presentation> {
        self.advance(user_id, Some((index, outcome)))
    }

    /// Cards for everything the user kept, in the order they were kept.
    pub fn history(&mut self, user_id: i64) -> McpResult<String> {
        let record = self.store.load(user_id)?;
        Ok(build_history(&self.catalog, &record.state))
    }

    pub fn status(&mut self, user_id: i64) -> McpResult<UserStatus> {
        let record = self.store.load(user_id)?;
        Ok(UserStatus {
            user_id,
            saved: record.state.decided.len(),
            catalog_size: self.catalog.len(),
            exhausted: record.state.is_exhausted(self.catalog.len()),
            last_shown: record.last_shown,
            created_at: record.created_at,
        })
    }

    fn advance(
        &mut self,
        user_id: i64,
        decision: Option<(Option<usize>, Outcome)>,
    ) -> McpResult<Presentation> {
        let catalog: &Catalog = &self.catalog;
        let engine = self.engine;
        let rng = &mut self.rng;
        let passed = &mut self.passed;

        self.store.update(user_id, |record| {
            if let Some((index, outcome)) = decision {
                let index = index.or(record.last_shown).ok_or_else(|| {
                    McpError::InvalidParams(format!(
                        "No entry has been shown to user {user_id}; start first"
                    ))
                })?;

                let effect = engine.record_decision(catalog, &mut record.state, index, outcome)?;
                match effect {
                    DecisionEffect::Skipped => {
                        passed.entry(user_id).or_default().insert(index);
                    }
                    DecisionEffect::Saved | DecisionEffect::AlreadySaved => {
                        if let Some(set) = passed.get_mut(&user_id) {
                            set.remove(&index);
                            if set.is_empty() {
                                passed.remove(&user_id);
                            }
                        }
                    }
                }
                tracing::info!("User {user_id} {outcome} entry {index}");
            }

            let empty = HashSet::new();
            let user_passed = passed.get(&user_id).unwrap_or(&empty);
            let selection = engine.select_next(catalog, &record.state, user_passed, rng);
            record.last_shown = selection.entry().map(|e| e.index);
            if selection.is_exhausted() {
                tracing::info!("User {user_id} has exhausted the catalog");
                passed.remove(&user_id);
            }

            Ok(Presentation::from_selection(selection))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(n: usize) -> GobbleSessionManager {
        let catalog = Catalog::from_rows(
            (0..n).map(|i| (format!("Co {i}"), format!("Place {i}"), format!("Addr {i}"))),
        );
        GobbleSessionManager::with_parts(
            catalog,
            UserStore::open_in_memory().unwrap(),
            SessionOptions {
                strategy: SelectionStrategy::Complement,
                seed: Some(17),
            },
        )
    }

    #[test]
    fn test_start_presents_entry_and_remembers_it() {
        let mut s = session(5);
        let p = s.start(10).unwrap();
        let index = p.entry_index.unwrap();
        assert!(index < 5);
        assert_eq!(p.controls.len(), 2);
        assert_eq!(s.status(10).unwrap().last_shown, Some(index));
    }

    #[test]
    fn test_decide_without_index_uses_last_shown() {
        let mut s = session(5);
        let shown = s.start(1).unwrap().entry_index.unwrap();
        let next = s.decide(1, None, Outcome::Keep).unwrap();
        assert_ne!(next.entry_index, Some(shown));
        assert_eq!(s.status(1).unwrap().saved, 1);
        assert!(s.history(1).unwrap().contains(&format!("Place {shown}")));
    }

    #[test]
    fn test_decide_before_start_is_rejected() {
        let mut s = session(5);
        let err = s.decide(1, None, Outcome::Keep).unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
        assert!(!s.store().exists(1).unwrap());
    }

    #[test]
    fn test_invalid_reference_leaves_state_alone() {
        let mut s = session(5);
        let shown = s.start(1).unwrap().entry_index;
        let err = s.decide(1, Some(5), Outcome::Keep).unwrap_err();
        assert!(matches!(err, McpError::InvalidReference { index: 5, .. }));
        let status = s.status(1).unwrap();
        assert_eq!(status.saved, 0);
        assert_eq!(status.last_shown, shown);
    }

    #[test]
    fn test_keeping_everything_exhausts() {
        let mut s = session(3);
        let mut p = s.start(2).unwrap();
        while let Some(index) = p.entry_index {
            p = s.decide(2, Some(index), Outcome::Keep).unwrap();
        }
        assert!(p.exhausted);
        assert!(p.controls.is_empty());
        assert!(s.status(2).unwrap().exhausted);
        assert!(s.start(2).unwrap().exhausted);
    }

    #[test]
    fn test_status_and_start_agree_on_exhaustion() {
        let mut s = session(2);
        s.store
            .update(4, |r| {
                r.state.decided.insert(0);
                r.state.decided.insert(9);
                Ok(())
            })
            .unwrap();

        assert!(!s.status(4).unwrap().exhausted);
        assert_eq!(s.start(4).unwrap().entry_index, Some(1));
    }

    #[test]
    fn test_pass_cycle_tracked_only_for_users_who_pass() {
        let mut s = session(3);
        s.start(1).unwrap();
        s.decide(1, Some(0), Outcome::Keep).unwrap();
        assert!(s.passed.is_empty());

        s.decide(1, Some(1), Outcome::Discard).unwrap();
        assert_eq!(s.passed.get(&1).map(|p| p.len()), Some(1));

        s.decide(1, Some(1), Outcome::Keep).unwrap();
        assert!(!s.passed.contains_key(&1));

        s.decide(1, Some(2), Outcome::Discard).unwrap();
        s.decide(1, Some(2), Outcome::Keep).unwrap();
        assert!(s.start(1).unwrap().exhausted);
        assert!(s.passed.is_empty());
    }

    #[test]
    fn test_discarded_entries_not_repeated_within_cycle() {
        let mut s = session(4);
        let mut seen = HashSet::new();
        seen.insert(s.start(3).unwrap().entry_index.unwrap());
        for _ in 0..3 {
            let p = s.decide(3, None, Outcome::Discard).unwrap();
            assert!(seen.insert(p.entry_index.unwrap()));
        }
        assert_eq!(seen.len(), 4);
    }
}

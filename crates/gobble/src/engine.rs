//! Exhaustion-aware random selection and decision recording.

use std::collections::HashSet;
use std::str::FromStr;

use rand::Rng;

use crate::types::{Catalog, Entry, GobbleError, GobbleResult, Outcome, UserState};

/// How an undecided index is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Draw uniformly from the whole catalog and redraw while the index is excluded.
    /// Expected draws grow as `N / (N - excluded)`.
    Resample,
    /// Draw uniformly from the explicit set of candidates.
    #[default]
    Complement,
}

impl FromStr for SelectionStrategy {
    type Err = GobbleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resample" => Ok(SelectionStrategy::Resample),
            "complement" => Ok(SelectionStrategy::Complement),
            other => Err(GobbleError::InvalidInput(format!(
                "Unknown selection strategy '{other}'. Use 'resample' or 'complement'."
            ))),
        }
    }
}

/// Result of asking for the next entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    Entry(&'a Entry),
    Exhausted,
}

impl<'a> Selection<'a> {
    pub fn entry(&self) -> Option<&'a Entry> {
        match self {
            Selection::Entry(e) => Some(e),
            Selection::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Selection::Exhausted)
    }
}

/// What recording a decision changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionEffect {
    /// A keep added a new index to the decided set.
    Saved,
    /// A keep on an index that was already decided.
    AlreadySaved,
    /// A discard; nothing is persisted.
    Skipped,
}

/// Selects undecided entries and records decisions against a catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionEngine {
    strategy: SelectionStrategy,
}

impl SelectionEngine {
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Pick an entry the user has not decided, or report exhaustion.
    ///
    /// `passed` holds indices to avoid for now (discarded this cycle). When
    /// every undecided index is also passed, `passed` is ignored so the user
    /// still gets an entry until the catalog is truly exhausted.
    pub fn select_next<'c, R: Rng + ?Sized>(
        &self,
        catalog: &'c Catalog,
        user: &UserState,
        passed: &HashSet<usize>,
        rng: &mut R,
    ) -> Selection<'c> {
        let n = catalog.len();
        let decided = &user.decided;
        if user.is_exhausted(n) {
            return Selection::Exhausted;
        }

        let undecided = n - user.decided_within(n);
        let passed_undecided = passed
            .iter()
            .filter(|&&i| i < n && !decided.contains(i))
            .count();

        let empty = HashSet::new();
        let avoid = if passed_undecided >= undecided {
            tracing::debug!(
                "User {} passed every undecided entry; starting a new cycle",
                user.user_id
            );
            &empty
        } else {
            passed
        };
        let excluded = |i: usize| decided.contains(i) || avoid.contains(&i);

        let index = match self.strategy {
            SelectionStrategy::Resample => {
                let mut r = rng.gen_range(0..n);
                while excluded(r) {
                    r = rng.gen_range(0..n);
                }
                r
            }
            SelectionStrategy::Complement => {
                let candidates = if avoid.is_empty() {
                    undecided
                } else {
                    undecided - passed_undecided
                };
                let k = rng.gen_range(0..candidates);
                match (0..n).filter(|&i| !excluded(i)).nth(k) {
                    Some(i) => i,
                    None => return Selection::Exhausted,
                }
            }
        };

        match catalog.get(index) {
            Some(entry) => Selection::Entry(entry),
            None => Selection::Exhausted,
        }
    }

    /// Record a decision on `index` for `user`.
    ///
    /// Out-of-range indices are rejected without touching `user`. Only keeps
    /// are stored; keeping an already-decided index is a no-op.
    pub fn record_decision(
        &self,
        catalog: &Catalog,
        user: &mut UserState,
        index: usize,
        outcome: Outcome,
    ) -> GobbleResult<DecisionEffect> {
        if !catalog.contains(index) {
            return Err(GobbleError::InvalidReference {
                index,
                catalog_size: catalog.len(),
            });
        }

        let effect = match outcome {
            Outcome::Keep if user.decided.insert(index) => DecisionEffect::Saved,
            Outcome::Keep => DecisionEffect::AlreadySaved,
            Outcome::Discard => DecisionEffect::Skipped,
        };

        tracing::debug!("User {} {outcome} entry {index}: {effect:?}", user.user_id);
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DecidedSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog(n: usize) -> Catalog {
        Catalog::from_rows((0..n).map(|i| {
            (
                format!("COMPANY {i}"),
                format!("PLACE {i}"),
                format!("{i} STREET, SINGAPORE 000000"),
            )
        }))
    }

    fn engines() -> [SelectionEngine; 2] {
        [
            SelectionEngine::new(SelectionStrategy::Resample),
            SelectionEngine::new(SelectionStrategy::Complement),
        ]
    }

    #[test]
    fn test_fresh_user_gets_an_entry() {
        let cat = catalog(5);
        let user = UserState::new(1);
        let mut rng = StdRng::seed_from_u64(7);
        for engine in engines() {
            let sel = engine.select_next(&cat, &user, &HashSet::new(), &mut rng);
            let entry = sel.entry().expect("entry");
            assert!(entry.index < 5);
        }
    }

    #[test]
    fn test_never_returns_decided_index() {
        let cat = catalog(6);
        let mut user = UserState::new(1);
        user.decided = [0, 2, 3, 5].into_iter().collect::<DecidedSet>();
        let mut rng = StdRng::seed_from_u64(42);

        for engine in engines() {
            for _ in 0..200 {
                let entry = engine
                    .select_next(&cat, &user, &HashSet::new(), &mut rng)
                    .entry()
                    .unwrap();
                assert!(entry.index == 1 || entry.index == 4);
            }
        }
    }

    #[test]
    fn test_keep_everything_reaches_exhaustion_monotonically() {
        let cat = catalog(5);
        let mut rng = StdRng::seed_from_u64(3);

        for engine in engines() {
            let mut user = UserState::new(9);
            let mut last_len = 0;
            loop {
                match engine.select_next(&cat, &user, &HashSet::new(), &mut rng) {
                    Selection::Entry(entry) => {
                        assert!(!user.decided.contains(entry.index));
                        engine
                            .record_decision(&cat, &mut user, entry.index, Outcome::Keep)
                            .unwrap();
                        assert!(user.decided.len() > last_len);
                        assert!(user.decided.len() <= cat.len());
                        last_len = user.decided.len();
                    }
                    Selection::Exhausted => break,
                }
            }
            assert_eq!(user.decided.len(), 5);
            for _ in 0..10 {
                assert!(engine
                    .select_next(&cat, &user, &HashSet::new(), &mut rng)
                    .is_exhausted());
            }
        }
    }

    #[test]
    fn test_fully_decided_user_is_exhausted() {
        let cat = catalog(5);
        let mut user = UserState::new(1);
        user.decided = (0..5).collect();
        let mut rng = StdRng::seed_from_u64(0);
        for engine in engines() {
            assert_eq!(
                engine.select_next(&cat, &user, &HashSet::new(), &mut rng),
                Selection::Exhausted
            );
        }
    }

    #[test]
    fn test_out_of_range_decisions_do_not_count_toward_exhaustion() {
        let cat = catalog(3);
        let mut user = UserState::new(1);
        user.decided = [0, 1, 7, 9].into_iter().collect::<DecidedSet>();
        assert!(!user.is_exhausted(cat.len()));

        let mut rng = StdRng::seed_from_u64(5);
        for engine in engines() {
            let entry = engine
                .select_next(&cat, &user, &HashSet::new(), &mut rng)
                .entry()
                .unwrap();
            assert_eq!(entry.index, 2);
        }

        user.decided.insert(2);
        assert!(user.is_exhausted(cat.len()));
    }

    #[test]
    fn test_empty_catalog_is_exhausted() {
        let cat = catalog(0);
        let user = UserState::new(1);
        let mut rng = StdRng::seed_from_u64(0);
        for engine in engines() {
            assert!(engine
                .select_next(&cat, &user, &HashSet::new(), &mut rng)
                .is_exhausted());
        }
    }

    #[test]
    fn test_passed_entries_are_avoided_until_cycle_resets() {
        let cat = catalog(3);
        let mut user = UserState::new(1);
        user.decided.insert(0);
        let mut rng = StdRng::seed_from_u64(11);

        for engine in engines() {
            let passed: HashSet<usize> = [1].into_iter().collect();
            for _ in 0..50 {
                let entry = engine.select_next(&cat, &user, &passed, &mut rng).entry().unwrap();
                assert_eq!(entry.index, 2);
            }

            let passed: HashSet<usize> = [1, 2].into_iter().collect();
            let entry = engine.select_next(&cat, &user, &passed, &mut rng).entry().unwrap();
            assert!(entry.index == 1 || entry.index == 2);
        }
    }

    #[test]
    fn test_keep_twice_is_idempotent() {
        let cat = catalog(5);
        let engine = SelectionEngine::default();
        let mut user = UserState::new(1);

        assert_eq!(
            engine.record_decision(&cat, &mut user, 2, Outcome::Keep).unwrap(),
            DecisionEffect::Saved
        );
        assert_eq!(
            engine.record_decision(&cat, &mut user, 2, Outcome::Keep).unwrap(),
            DecisionEffect::AlreadySaved
        );
        assert_eq!(user.decided.iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_discard_is_not_persisted() {
        let cat = catalog(5);
        let engine = SelectionEngine::default();
        let mut user = UserState::new(1);
        assert_eq!(
            engine.record_decision(&cat, &mut user, 3, Outcome::Discard).unwrap(),
            DecisionEffect::Skipped
        );
        assert!(user.decided.is_empty());
    }

    #[test]
    fn test_out_of_range_reference_is_rejected_without_mutation() {
        let cat = catalog(5);
        let engine = SelectionEngine::default();
        let mut user = UserState::new(1);
        user.decided.insert(1);
        let before = user.clone();

        let err = engine
            .record_decision(&cat, &mut user, 5, Outcome::Keep)
            .unwrap_err();
        assert!(matches!(
            err,
            GobbleError::InvalidReference {
                index: 5,
                catalog_size: 5
            }
        ));
        assert_eq!(user, before);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "resample".parse::<SelectionStrategy>().unwrap(),
            SelectionStrategy::Resample
        );
        assert_eq!(
            "Complement".parse::<SelectionStrategy>().unwrap(),
            SelectionStrategy::Complement
        );
        assert!("ranked".parse::<SelectionStrategy>().is_err());
    }
}

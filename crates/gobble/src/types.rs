//! Core data types for catalog entries and per-user decision state.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One catalog item with a stable 0-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub index: usize,
    pub company: String,
    pub name: String,
    pub address: String,
}

/// Immutable, ordered sequence of entries. Indices are contiguous from 0.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Entry>,
    pub created_at: u64,
}

impl Catalog {
    /// Build a catalog from `(company, name, address)` rows; row order assigns indices.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(index, (company, name, address))| Entry {
                index,
                company,
                name,
                address,
            })
            .collect();

        Self {
            entries,
            created_at: now_secs(),
        }
    }

    /// Get an entry by index.
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Whether `index` refers to an entry of this catalog.
    pub fn contains(&self, index: usize) -> bool {
        index < self.entries.len()
    }
}

/// Indices a user has already acted on, in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecidedSet {
    order: Vec<usize>,
    members: HashSet<usize>,
}

impl DecidedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an index. Returns `false` if it was already present.
    pub fn insert(&mut self, index: usize) -> bool {
        if !self.members.insert(index) {
            return false;
        }
        self.order.push(index);
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Indices in recorded order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    /// Encode as the legacy `"3, 0, 7"` list; empty string when none.
    pub fn to_saved_list(&self) -> String {
        self.order
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parse the legacy `"3, 0, 7"` list.
    ///
    /// Empty cells and not-a-number markers (`nan`, `NaN`, `None`) yield an
    /// empty set. Tokens that are not decimal integers are skipped.
    pub fn parse_saved_list(cell: &str) -> Self {
        let mut set = Self::new();
        let trimmed = cell.trim();
        if trimmed.is_empty() || is_missing_marker(trimmed) {
            return set;
        }

        for token in trimmed.split(',') {
            match token.trim().parse::<usize>() {
                Ok(index) => {
                    set.insert(index);
                }
                Err(_) => {
                    tracing::warn!("Skipping non-numeric saved index {:?}", token.trim());
                }
            }
        }
        set
    }
}

impl FromIterator<usize> for DecidedSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut set = Self::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

fn is_missing_marker(cell: &str) -> bool {
    matches!(
        cell.to_ascii_lowercase().as_str(),
        "nan" | "none" | "null" | "n/a"
    )
}

/// Per-user decision state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    pub user_id: i64,
    pub decided: DecidedSet,
}

impl UserState {
    /// A fresh user with nothing decided.
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            decided: DecidedSet::new(),
        }
    }

    /// Decided indices that fall inside a catalog of `catalog_size`.
    pub fn decided_within(&self, catalog_size: usize) -> usize {
        self.decided.iter().filter(|&i| i < catalog_size).count()
    }

    /// Whether every entry of a catalog of `catalog_size` has been decided.
    pub fn is_exhausted(&self, catalog_size: usize) -> bool {
        self.decided_within(catalog_size) >= catalog_size
    }
}

/// What a user chose for a presented entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[serde(alias = "smash")]
    Keep,
    #[serde(alias = "pass")]
    Discard,
}

impl FromStr for Outcome {
    type Err = GobbleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "smash" => Ok(Outcome::Keep),
            "discard" | "pass" => Ok(Outcome::Discard),
            other => Err(GobbleError::InvalidInput(format!(
                "Unknown outcome '{other}'. Use 'keep' or 'discard'."
            ))),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Keep => write!(f, "keep"),
            Outcome::Discard => write!(f, "discard"),
        }
    }
}

pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Errors that can occur in the gobble library.
#[derive(thiserror::Error, Debug)]
pub enum GobbleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid entry reference {index}: catalog has {catalog_size} entries")]
    InvalidReference { index: usize, catalog_size: usize },

    #[error("Malformed record at position {position}: {reason}")]
    MalformedRecord { position: usize, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type GobbleResult<T> = Result<T, GobbleError>;

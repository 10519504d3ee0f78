//! Gobble: restaurant catalog ingestion and no-repeat swipe selection.

pub mod engine;
pub mod ingest;
pub mod render;
pub mod storage;
pub mod types;

pub use engine::{DecisionEffect, Selection, SelectionEngine, SelectionStrategy};
pub use ingest::{build_catalog, Feature, FeatureCollection};
pub use render::{build_history, render, render_card, EXHAUSTED_TEXT};
pub use storage::{CatalogReader, CatalogWriter};
pub use types::*;

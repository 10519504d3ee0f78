//! Tools exposed over `tools/call`.

pub mod gobble_decide;
pub mod gobble_history;
pub mod gobble_start;
pub mod gobble_status;
pub mod registry;

pub use registry::ToolRegistry;

//! Gobble bot: chat-facing adapter over the gobble selection engine.

pub mod config;
pub mod ingest;
pub mod protocol;
pub mod repl;
pub mod session;
pub mod store;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{resolve_catalog_path, resolve_users_path};
pub use protocol::ProtocolHandler;
pub use session::GobbleSessionManager;
pub use transport::StdioTransport;

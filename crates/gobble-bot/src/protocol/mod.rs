//! JSON-RPC protocol handling.

pub mod handler;
pub mod negotiation;
pub mod validator;

pub use handler::ProtocolHandler;

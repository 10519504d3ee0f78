//! Server error type and the JSON-RPC codes it maps to.

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Gobble-specific error codes.
pub mod gobble_error_codes {
    pub const TOOL_NOT_FOUND: i32 = -32803;
    /// The decision referenced an entry outside the catalog.
    pub const INVALID_REFERENCE: i32 = -32850;
    pub const CATALOG_NOT_FOUND: i32 = -32851;
    pub const STORE_ERROR: i32 = -32852;
    pub const CATALOG_ERROR: i32 = -32853;
}

/// All errors that can occur in the bot.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid entry reference {index}: catalog has {catalog_size} entries")]
    InvalidReference { index: usize, catalog_size: usize },

    #[error("Catalog not found at {0}. Run `gobble-bot ingest` first.")]
    CatalogNotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("User store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use gobble_error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::Json(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::InvalidReference { .. } => INVALID_REFERENCE,
            McpError::CatalogNotFound(_) => CATALOG_NOT_FOUND,
            McpError::Catalog(_) => CATALOG_ERROR,
            McpError::Store(_) => STORE_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string())
    }
}

impl From<gobble::GobbleError> for McpError {
    fn from(e: gobble::GobbleError) -> Self {
        match e {
            gobble::GobbleError::InvalidReference {
                index,
                catalog_size,
            } => McpError::InvalidReference {
                index,
                catalog_size,
            },
            gobble::GobbleError::InvalidInput(msg) => McpError::InvalidParams(msg),
            gobble::GobbleError::Io(e) => McpError::Io(e),
            other => McpError::Catalog(other.to_string()),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

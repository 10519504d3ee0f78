//! Tool registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::session::GobbleSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{gobble_decide, gobble_history, gobble_start, gobble_status};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            gobble_start::definition(),
            gobble_decide::definition(),
            gobble_history::definition(),
            gobble_status::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        session: &Arc<Mutex<GobbleSessionManager>>,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "gobble_start" => gobble_start::execute(args, session).await,
            "gobble_decide" => gobble_decide::execute(args, session).await,
            "gobble_history" => gobble_history::execute(args, session).await,
            "gobble_status" => gobble_status::execute(args, session).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}

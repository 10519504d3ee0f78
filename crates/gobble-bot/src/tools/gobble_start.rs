//! `gobble_start`: Register a user and present their first entry.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::GobbleSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct StartParams {
    user_id: i64,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "gobble_start".to_string(),
        description: Some("Register a user if new and present an undecided restaurant".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "integer", "description": "Chat id of the user" }
            },
            "required": ["user_id"]
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<GobbleSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: StartParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let mut session = session.lock().await;
    let presentation = session.start(params.user_id)?;

    Ok(ToolCallResult::json(&presentation))
}

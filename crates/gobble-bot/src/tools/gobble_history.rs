//! `gobble_history`: List every restaurant a user kept.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::GobbleSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct HistoryParams {
    user_id: i64,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "gobble_history".to_string(),
        description: Some("Render every restaurant the user kept, oldest first".to_string()),
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
    let params: HistoryParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let mut session = session.lock().await;
    let text = session.history(params.user_id)?;

    Ok(ToolCallResult::text(text))
}

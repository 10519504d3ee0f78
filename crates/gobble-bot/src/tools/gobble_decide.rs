//! `gobble_decide`: Keep or discard an entry and present the next one.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use gobble::Outcome;

use crate::session::GobbleSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct DecideParams {
    user_id: i64,
    outcome: Outcome,
    /// Falls back to the entry last shown to the user.
    #[serde(default)]
    index: Option<usize>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "gobble_decide".to_string(),
        description: Some(
            "Record keep (smash) or discard (pass) for a presented restaurant, then present the next"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "integer", "description": "Chat id of the user" },
                "outcome": {
                    "type": "string",
                    "enum": ["keep", "discard", "smash", "pass"],
                    "description": "What the user chose"
                },
                "index": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Entry index from the presentation; defaults to the last one shown"
                }
            },
            "required": ["user_id", "outcome"]
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<GobbleSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: DecideParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let mut session = session.lock().await;
    let presentation = session.decide(params.user_id, params.index, params.outcome)?;

    Ok(ToolCallResult::json(&presentation))
}

//! Stdio transport: reads JSON-RPC lines from stdin, writes replies to stdout.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::ProtocolHandler;
use crate::types::{McpResult, RequestId};

use super::framing;

pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Serve until stdin closes.
    pub async fn run(&self) -> McpResult<()> {
        let mut reader = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut line = String::new();

        tracing::info!("Stdio transport started");

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let reply = match framing::parse_message(trimmed) {
                Ok(msg) => self.handler.handle_message(msg).await,
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    Some(serde_json::to_value(e.to_json_rpc_error(RequestId::Null))?)
                }
            };

            if let Some(reply) = reply {
                write_line(&mut stdout, &reply).await?;
            }
        }

        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, value: &serde_json::Value) -> McpResult<()> {
    let framed = framing::frame_message(value)?;
    out.write_all(framed.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

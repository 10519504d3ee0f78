//! Capability handshake state.

use crate::types::{InitializeParams, InitializeResult, PROTOCOL_VERSION};

/// Whether the client has finished the handshake.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    initialized: bool,
}

impl NegotiatedCapabilities {
    pub fn negotiate(&mut self, params: InitializeParams) -> InitializeResult {
        if params.protocol_version != PROTOCOL_VERSION {
            tracing::warn!(
                "Client requested protocol version {}, server speaks {}; continuing",
                params.protocol_version,
                PROTOCOL_VERSION
            );
        }

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );
        tracing::debug!(
            "Client capabilities: {:?}",
            params.capabilities.keys().collect::<Vec<_>>()
        );

        InitializeResult::default_result()
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        tracing::info!("Handshake complete");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialized_only_after_notification() {
        let mut caps = NegotiatedCapabilities::default();
        let params: InitializeParams = serde_json::from_value(serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": { "name": "chat-adapter", "version": "1.0" }
        }))
        .unwrap();

        let result = caps.negotiate(params);
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
        assert!(!caps.is_initialized());

        caps.mark_initialized();
        assert!(caps.is_initialized());
    }
}

use serde::Serialize;

/// Health of the poll pipeline as seen by the status surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No poll cycle has completed yet.
    Starting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Terminal: retries exhausted, operator intervention required.
    Failed { attempts: u32 },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed { .. })
    }

    pub fn attempt(&self) -> u32 {
        match self {
            ConnectionState::Starting | ConnectionState::Connected => 0,
            ConnectionState::Reconnecting { attempt } => *attempt,
            ConnectionState::Failed { attempts } => *attempts,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Starting => "starting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting { .. } => "reconnecting",
            ConnectionState::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_with_tag() {
        let value = serde_json::to_value(ConnectionState::Reconnecting { attempt: 3 }).unwrap();
        assert_eq!(value, serde_json::json!({"state": "reconnecting", "attempt": 3}));
    }

    #[test]
    fn test_only_failed_is_terminal() {
        assert!(ConnectionState::Failed { attempts: 10 }.is_terminal());
        assert!(!ConnectionState::Reconnecting { attempt: 10 }.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
    }
}

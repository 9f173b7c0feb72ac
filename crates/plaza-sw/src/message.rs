//! Page → worker control channel.
//!
//! The page sends commands as small JSON objects, fire-and-forget. The only
//! recognized shape is `{ "type": "SKIP_WAITING" }`; anything else is
//! ignored silently.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Control command sent from the page to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Force the transition out of `waiting` into `activating`.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a raw message, returning `None` for unrecognized shapes.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(message) => Some(message),
            Err(_) => {
                trace!(message = raw, "Ignoring unrecognized control message");
                None
            }
        }
    }

    /// Wire encoding of the command.
    pub fn to_json(&self) -> String {
        // A unit variant always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skip_waiting() {
        let message = ControlMessage::parse(r#"{ "type": "SKIP_WAITING" }"#);
        assert_eq!(message, Some(ControlMessage::SkipWaiting));
    }

    #[test]
    fn test_unknown_commands_are_ignored() {
        assert_eq!(ControlMessage::parse(r#"{ "type": "REFRESH" }"#), None);
        assert_eq!(ControlMessage::parse(r#"{ "kind": "SKIP_WAITING" }"#), None);
        assert_eq!(ControlMessage::parse("not json"), None);
    }

    #[test]
    fn test_wire_round_trip() {
        let raw = ControlMessage::SkipWaiting.to_json();
        assert_eq!(raw, r#"{"type":"SKIP_WAITING"}"#);
        assert_eq!(ControlMessage::parse(&raw), Some(ControlMessage::SkipWaiting));
    }
}

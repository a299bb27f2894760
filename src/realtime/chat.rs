//! Chat log and signaling-channel wire messages.
//!
//! Inbound data-channel payloads are newline-free JSON objects discriminated
//! by a `kind` field. Unknown kinds and malformed JSON are logged and
//! dropped at this boundary; they never reach the session state machine as
//! errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Who a chat entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    #[serde(rename = "user")]
    LocalUser,
    #[serde(rename = "ai")]
    RemoteAi,
    System,
}

impl Identity {
    /// The wire word used by the UI for this identity.
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::LocalUser => "user",
            Identity::RemoteAi => "ai",
            Identity::System => "system",
        }
    }
}

/// One entry in the conversation log.
///
/// Entries are append-only: ordering is arrival order, and an entry is never
/// mutated or removed after creation. The timestamp is the local wall-clock
/// time of receipt, not a value carried in any payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEntry {
    pub identity: Identity,
    pub display_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(identity: Identity, display_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only conversation log.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Mutex<Vec<ChatEntry>>,
}

impl ChatLog {
    pub fn push(&self, entry: ChatEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the current entries, in arrival order.
    pub fn snapshot(&self) -> Vec<ChatEntry> {
        self.entries.lock().unwrap().clone()
    }
}

/// Inbound signaling-channel event, discriminated by `kind`.
///
/// Anything that is not a known kind deserializes to `Unknown` instead of
/// failing, so new upstream event kinds never abort a session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignalEvent {
    /// Transcription of the local user's speech.
    Transcript { text: String },
    /// A reply from the remote model.
    Response { text: String },
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transcript_event() {
        let event: SignalEvent =
            serde_json::from_str(r#"{"kind":"transcript","text":"hello"}"#).unwrap();
        assert_eq!(
            event,
            SignalEvent::Transcript {
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn parses_response_event() {
        let event: SignalEvent =
            serde_json::from_str(r#"{"kind":"response","text":"hi there"}"#).unwrap();
        assert_eq!(
            event,
            SignalEvent::Response {
                text: "hi there".to_string()
            }
        );
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let event: SignalEvent =
            serde_json::from_str(r#"{"kind":"speech.started","audio_ms":120}"#).unwrap();
        assert_eq!(event, SignalEvent::Unknown);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(serde_json::from_str::<SignalEvent>("not json at all").is_err());
        assert!(serde_json::from_str::<SignalEvent>(r#"{"text":"no kind"}"#).is_err());
    }

    #[test]
    fn log_preserves_arrival_order() {
        let log = ChatLog::default();
        log.push(ChatEntry::new(Identity::LocalUser, "You", "first"));
        log.push(ChatEntry::new(Identity::RemoteAi, "AI Assistant", "second"));
        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "first");
        assert_eq!(entries[1].text, "second");
        assert_eq!(entries[1].identity.kind(), "ai");
    }
}

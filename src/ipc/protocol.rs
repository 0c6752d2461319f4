//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::calculator::{DisplaySnapshot, Operator};
use crate::events::AppEvent;
use crate::input::Action;
use crate::voice::TranscriptSegment;

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from clients to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current calculator status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to event notifications
    Subscribe,

    /// Press a key by token (`"7"`, `"+"`, `"enter"`, `"mic"`)
    Press { key: String },

    /// Select an operator
    Operator { operator: Operator },

    /// Trigger a control action
    Action { action: Action },

    /// Transcript update from an external recognizer
    Transcript { segments: Vec<TranscriptSegment> },

    /// The external recognizer's stream ended
    TranscriptEnded,

    /// The external recognizer reported an error
    TranscriptError { reason: String },
}

/// Responses from daemon to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current calculator status
    Status(CalculatorStatus),

    /// Input or transcript update queued
    Accepted,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: AppEvent },
}

/// Full calculator status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorStatus {
    /// Daemon version
    pub version: String,

    /// Display lines
    pub display: DisplaySnapshot,

    /// Latest status line
    pub status_text: String,

    /// Live transcript while listening
    pub live_transcript: String,

    /// Whether a voice command is being captured
    pub listening: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for CalculatorStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            display: DisplaySnapshot {
                current: "0".to_string(),
                previous: String::new(),
            },
            status_text: String::new(),
            live_transcript: String::new(),
            listening: false,
            uptime_secs: 0,
        }
    }
}

impl CalculatorStatus {
    /// Fold an application event into the snapshot
    pub fn apply(&mut self, event: &AppEvent) {
        match event {
            AppEvent::DisplayChanged(display) => self.display = display.clone(),
            AppEvent::Status { text } => self.status_text = text.clone(),
            AppEvent::LiveTranscript { text } => self.live_transcript = text.clone(),
            AppEvent::ListeningStarted => self.listening = true,
            AppEvent::ListeningStopped { .. } => self.listening = false,
            AppEvent::Speak { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::Operator {
            operator: Operator::Divide,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""type":"operator""#));
        assert!(json.contains("divide"));
    }

    #[test]
    fn test_transcript_request_deserialization() {
        let json = r#"{"type":"transcript","segments":[{"text":"add 4","is_final":true}]}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            req,
            Request::Transcript {
                segments: vec![TranscriptSegment::finalized("add 4")]
            }
        );

        let req: Request = serde_json::from_str(r#"{"type":"action","action":"toggle_listening"}"#).unwrap();
        assert_eq!(
            req,
            Request::Action {
                action: Action::ToggleListening
            }
        );
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(CalculatorStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""listening":false"#));
    }

    #[test]
    fn test_notification_nests_event() {
        let note = Notification::Event {
            event: AppEvent::ListeningStarted,
        };
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            r#"{"type":"event","event":{"type":"listening_started"}}"#
        );
    }

    #[test]
    fn test_status_tracks_events() {
        let mut status = CalculatorStatus::default();
        status.apply(&AppEvent::ListeningStarted);
        status.apply(&AppEvent::LiveTranscript {
            text: "add 4".to_string(),
        });
        assert!(status.listening);
        assert_eq!(status.live_transcript, "add 4");

        status.apply(&AppEvent::ListeningStopped { evaluated: true });
        status.apply(&AppEvent::DisplayChanged(DisplaySnapshot {
            current: "13".to_string(),
            previous: "4 + 9 =".to_string(),
        }));
        assert!(!status.listening);
        assert_eq!(status.display.current, "13");
    }
}

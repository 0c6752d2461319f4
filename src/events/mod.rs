//! Events module for calculator and voice session changes
//!
//! Every event is a projection for the outside world (display, speech,
//! IPC subscribers); nothing feeds back into calculator state.

use serde::{Deserialize, Serialize};

use crate::calculator::DisplaySnapshot;

/// Events emitted by the application while handling input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Display lines changed
    DisplayChanged(DisplaySnapshot),

    /// Status line text changed
    Status { text: String },

    /// Live transcript while listening
    LiveTranscript { text: String },

    /// Wake phrase heard or listening toggled on
    ListeningStarted,

    /// Listening ended, with or without evaluating the transcript
    ListeningStopped {
        /// Whether the transcript was handed to the evaluator
        evaluated: bool,
    },

    /// Text for the speech output sink
    Speak { text: String },
}

impl std::fmt::Display for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppEvent::DisplayChanged(snapshot) => {
                write!(f, "DISPLAY [{}] [{}]", snapshot.previous, snapshot.current)
            }
            AppEvent::Status { text } => write!(f, "STATUS {}", text),
            AppEvent::LiveTranscript { text } => write!(f, "TRANSCRIPT {}", text),
            AppEvent::ListeningStarted => write!(f, "LISTENING_STARTED"),
            AppEvent::ListeningStopped { evaluated } => {
                write!(f, "LISTENING_STOPPED (evaluated: {})", evaluated)
            }
            AppEvent::Speak { text } => write!(f, "SPEAK {}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::ListeningStopped { evaluated: true };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("listening_stopped"));
        assert!(json.contains("true"));
    }

    #[test]
    fn test_display_event_flattens_snapshot() {
        let event = AppEvent::DisplayChanged(DisplaySnapshot {
            current: "13".to_string(),
            previous: "4 + 9 =".to_string(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"display_changed""#));
        assert!(json.contains(r#""current":"13""#));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"speak","text":"The answer is 13"}"#;
        let event: AppEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            AppEvent::Speak {
                text: "The answer is 13".to_string()
            }
        );
    }
}

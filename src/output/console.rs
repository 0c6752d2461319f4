//! Console rendering of application events

use crate::events::AppEvent;

/// Render an event as a console line, or `None` if it has no display
pub fn render_event(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::DisplayChanged(display) => {
            if display.previous.is_empty() {
                Some(format!("[ {} ]", display.current))
            } else {
                Some(format!("[ {} | {} ]", display.previous, display.current))
            }
        }
        AppEvent::Status { text } if !text.is_empty() => Some(format!("status: {text}")),
        AppEvent::LiveTranscript { text } if !text.is_empty() => Some(format!("heard: {text}")),
        AppEvent::Speak { text } => Some(format!("speaking: {text}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::DisplaySnapshot;

    #[test]
    fn test_render_display() {
        let event = AppEvent::DisplayChanged(DisplaySnapshot {
            current: "13".to_string(),
            previous: "4 + 9 =".to_string(),
        });
        assert_eq!(render_event(&event).as_deref(), Some("[ 4 + 9 = | 13 ]"));

        let event = AppEvent::DisplayChanged(DisplaySnapshot {
            current: "1,024".to_string(),
            previous: String::new(),
        });
        assert_eq!(render_event(&event).as_deref(), Some("[ 1,024 ]"));
    }

    #[test]
    fn test_silent_events() {
        assert_eq!(render_event(&AppEvent::ListeningStarted), None);
        assert_eq!(
            render_event(&AppEvent::LiveTranscript {
                text: String::new()
            }),
            None
        );
    }
}

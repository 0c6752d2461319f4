//! Speech output sink
//!
//! Fire-and-forget: the utterance is logged and, when a TTS command is
//! configured, handed to it as a single argument on a background task.

use tokio::process::Command;
use tracing::{debug, info, warn};

/// Speaks text through an optional external command
#[derive(Debug, Clone, Default)]
pub struct Speaker {
    command: Option<String>,
}

impl Speaker {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    /// Split the configured command into program and leading arguments
    fn command_line(&self) -> Option<(String, Vec<String>)> {
        let mut parts = self.command.as_deref()?.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some((program, parts.collect()))
    }

    /// Request that `text` be spoken; never waits for playback
    pub fn speak(&self, text: &str) {
        info!(%text, "speaking");

        let Some((program, args)) = self.command_line() else {
            return;
        };

        let mut command = Command::new(&program);
        command.args(&args).arg(text);

        match command.spawn() {
            Ok(mut child) => {
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if status.success() => debug!("speech finished"),
                        Ok(status) => warn!(%status, "speech command failed"),
                        Err(e) => warn!(?e, "failed to wait for speech command"),
                    }
                });
            }
            Err(e) => warn!(?e, %program, "failed to start speech command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_split() {
        let speaker = Speaker::new(Some("espeak -v en-us".to_string()));
        assert_eq!(
            speaker.command_line(),
            Some((
                "espeak".to_string(),
                vec!["-v".to_string(), "en-us".to_string()]
            ))
        );
    }

    #[test]
    fn test_without_command_only_logs() {
        let speaker = Speaker::default();
        assert_eq!(speaker.command_line(), None);
        speaker.speak("The answer is 13");
    }
}

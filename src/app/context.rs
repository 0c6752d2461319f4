//! Application context owning calculator and voice state
//!
//! All state transitions happen synchronously inside the handlers below,
//! driven from a single task by [`App::run`].

use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::calculator::{Accumulator, CalcError};
use crate::events::AppEvent;
use crate::input::{Action, InputEvent};
use crate::voice::{
    RecognitionSupervisor, RestartDecision, TranscriptEvent, TranscriptFeed, VoiceController,
    VoiceOutcome, VoicePhase,
};

/// Voice controller together with the supervisor of its transcript source
pub struct VoiceSession {
    pub controller: VoiceController,
    pub supervisor: RecognitionSupervisor<TranscriptFeed>,
}

/// Calculator and voice state for one daemon process
pub struct App {
    accumulator: Accumulator,
    voice: Option<VoiceSession>,
    /// Deadline for restarting an ended transcript stream
    restart_at: Option<Instant>,
    event_tx: broadcast::Sender<AppEvent>,
}

impl App {
    /// Create an application without voice commands
    pub fn new(event_tx: broadcast::Sender<AppEvent>) -> Self {
        Self {
            accumulator: Accumulator::new(),
            voice: None,
            restart_at: None,
            event_tx,
        }
    }

    /// Create an application with voice commands
    pub fn with_voice(event_tx: broadcast::Sender<AppEvent>, voice: VoiceSession) -> Self {
        Self {
            voice: Some(voice),
            ..Self::new(event_tx)
        }
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn voice_phase(&self) -> VoicePhase {
        self.voice
            .as_ref()
            .map(|session| session.controller.phase())
            .unwrap_or_default()
    }

    /// Start recognition and wait for the wake phrase
    pub fn start_voice(&mut self) {
        let Some(session) = self.voice.as_mut() else {
            self.emit_status("Voice commands are unavailable.");
            return;
        };

        match session.supervisor.enable() {
            Ok(()) => {
                session.controller.arm();
                info!(wake_phrase = %session.controller.wake_phrase(), "voice recognition started");
            }
            Err(e) => {
                warn!(%e, "failed to start voice recognition");
                let text = format!("Voice recognition unavailable: {e}");
                self.emit_status(&text);
            }
        }
    }

    /// Stop recognition, suppressing automatic restarts
    pub fn stop_voice(&mut self) {
        if let Some(session) = self.voice.as_mut() {
            if session.supervisor.is_enabled() {
                debug!(
                    buffered = session.controller.transcript_buffer().len(),
                    "stopping voice recognition"
                );
            }
            session.supervisor.disable();
            session.controller.disarm();
        }
        self.restart_at = None;
    }

    /// Apply one calculator input and publish the new display
    pub fn handle_input(&mut self, event: InputEvent) {
        debug!(?event, "input received");

        let result = match event {
            InputEvent::Digit(token) => self.accumulator.append_digit(token),
            InputEvent::Operator(op) => self.accumulator.choose_operator(op),
            InputEvent::Action(Action::Compute) => self.accumulator.compute().map(|result| {
                if let Some(result) = result {
                    debug!(result, "computed");
                }
            }),
            InputEvent::Action(Action::Delete) => {
                self.accumulator.delete();
                Ok(())
            }
            InputEvent::Action(Action::Clear) => {
                self.accumulator.clear();
                Ok(())
            }
            InputEvent::Action(Action::ToggleListening) => {
                self.toggle_listening();
                Ok(())
            }
        };

        if let Err(e) = result {
            self.report_calc_error(&e);
        }

        self.emit_display();
    }

    /// Manual listening toggle; restarts recognition if it has stopped
    fn toggle_listening(&mut self) {
        match self.voice.as_mut() {
            None => self.emit_status("Voice commands are unavailable."),
            Some(session) if session.controller.phase() != VoicePhase::Idle => {
                session.controller.toggle();
            }
            Some(_) => {
                info!("listening toggle while recognition stopped, restarting");
                self.restart_at = None;
                self.start_voice();
            }
        }
    }

    /// Apply one update from the transcript source
    pub fn handle_transcript(&mut self, event: TranscriptEvent) {
        let Some(session) = self.voice.as_mut() else {
            debug!(?event, "voice commands disabled, ignoring transcript event");
            return;
        };

        match event {
            TranscriptEvent::Results(segments) => {
                session.supervisor.on_activity();
                let outcome = session
                    .controller
                    .handle_results(&segments, &mut self.accumulator);
                if matches!(outcome, VoiceOutcome::Evaluated { .. }) {
                    self.emit_display();
                }
            }
            TranscriptEvent::Error(error) => session.controller.handle_error(&error),
            TranscriptEvent::Ended => self.handle_stream_ended(),
        }
    }

    /// Run until the input channel closes
    ///
    /// Queued transcript updates are handled before queued key input.
    pub async fn run(
        &mut self,
        mut input_rx: mpsc::Receiver<InputEvent>,
        mut transcript_rx: mpsc::Receiver<TranscriptEvent>,
    ) {
        info!(voice = %self.voice_phase(), "application loop started");
        self.emit_display();

        let mut transcripts_open = true;

        loop {
            let restart_at = self.restart_at;

            tokio::select! {
                biased;

                event = transcript_rx.recv(), if transcripts_open => match event {
                    Some(event) => self.handle_transcript(event),
                    None => {
                        warn!("transcript channel closed");
                        transcripts_open = false;
                    }
                },
                input = input_rx.recv() => match input {
                    Some(event) => self.handle_input(event),
                    None => break,
                },
                _ = sleep_until(restart_at.unwrap_or_else(Instant::now)), if restart_at.is_some() => {
                    self.restart_recognition();
                }
            }
        }

        info!("application loop stopped");
    }

    fn handle_stream_ended(&mut self) {
        let Some(session) = self.voice.as_mut() else {
            return;
        };

        match session.supervisor.on_ended() {
            RestartDecision::Suppressed => {
                debug!("transcript stream ended while disabled");
            }
            RestartDecision::Restart { delay } => {
                self.restart_at = Some(Instant::now() + delay);
            }
            RestartDecision::GiveUp { attempts } => {
                warn!(attempts, "voice recognition stopped after repeated failures");
                session.controller.disarm();
                self.restart_at = None;
                self.emit_status("Voice recognition stopped.");
            }
        }
    }

    fn restart_recognition(&mut self) {
        self.restart_at = None;
        let Some(session) = self.voice.as_mut() else {
            return;
        };

        match session.supervisor.restart() {
            Ok(true) => info!("transcript source restarted"),
            Ok(false) => debug!("restart skipped, voice disabled"),
            Err(e) => {
                warn!(%e, "transcript source restart failed");
                self.handle_stream_ended();
            }
        }
    }

    fn report_calc_error(&self, error: &CalcError) {
        warn!(%error, "calculator input rejected");
        match error {
            CalcError::DivisionByZero => self.emit_status("Cannot divide by zero"),
            CalcError::Overflow => self.emit_status("Result is too large"),
            CalcError::InvalidDigit(_) => {}
        }
    }

    fn emit_display(&self) {
        self.emit(AppEvent::DisplayChanged(self.accumulator.snapshot()));
    }

    fn emit_status(&self, text: &str) {
        self.emit(AppEvent::Status {
            text: text.to_string(),
        });
    }

    fn emit(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }
}

//! voice-calculator: Background daemon for a voice-activated calculator
//!
//! This daemon provides:
//! - A numeric-entry accumulator driven by key input
//! - Wake/stop phrase voice commands over a streaming transcript
//! - IPC server for key presses, recognizer transcripts, and status
//!
//! Speech recognition and synthesis stay external: transcripts arrive on
//! the console or over IPC, and spoken replies go to an optional TTS command.

mod app;
mod calculator;
mod config;
mod events;
mod input;
mod ipc;
mod lifecycle;
mod output;
mod voice;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{App, VoiceSession};
use crate::config::Config;
use crate::events::AppEvent;
use crate::input::ConsoleListener;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::output::{render_event, Speaker};
use crate::voice::{RecognitionSupervisor, TranscriptFeed, VoiceController};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for the display
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voice-calculator starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        voice = config.voice.enabled,
        wake_phrase = %config.voice.wake_phrase,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // Console and IPC -> application
    let (input_tx, input_rx) = mpsc::channel(64);
    let (feed, transcript_rx) = TranscriptFeed::new(64);
    // Application -> display, speech, IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<AppEvent>(256);
    let mut sink_rx = event_tx.subscribe();

    let mut app = if config.voice.enabled {
        let session = VoiceSession {
            controller: VoiceController::new(
                &config.voice.wake_phrase,
                &config.voice.stop_phrase,
                event_tx.clone(),
            ),
            supervisor: RecognitionSupervisor::new(feed.clone(), config.voice.restart),
        };
        App::with_voice(event_tx.clone(), session)
    } else {
        warn!("voice commands disabled by configuration");
        App::new(event_tx.clone())
    };

    if config.voice.enabled {
        app.start_voice();
    }

    let console = ConsoleListener::new(input_tx.clone(), feed.clone(), shutdown.clone());
    match console.start() {
        Ok(()) => {
            info!("console listener started");
        }
        Err(e) => {
            error!(?e, "failed to start console listener");
            warn!("continuing without console input");
        }
    }

    let server = if config.ipc_enabled {
        Some(Server::new(
            &config.socket_path,
            input_tx.clone(),
            feed.clone(),
            event_tx.clone(),
        )?)
    } else {
        None
    };
    drop(input_tx);

    let speaker = Speaker::new(config.voice.tts_command.clone());

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Process key input and transcript updates
        _ = app.run(input_rx, transcript_rx) => {
            info!("application loop exited");
        }

        // Accept IPC clients
        result = async {
            match &server {
                Some(server) => server.run().await,
                None => std::future::pending().await,
            }
        } => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Project events onto the display, speech, and IPC status
        _ = async {
            loop {
                match sink_rx.recv().await {
                    Ok(event) => {
                        if let Some(line) = render_event(&event) {
                            println!("{line}");
                        }
                        if let AppEvent::Speak { text } = &event {
                            speaker.speak(text);
                        }
                        if let Some(server) = &server {
                            server.apply_event(&event).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    app.stop_voice();
    console.stop();
    if let Some(server) = &server {
        server.shutdown().await;
    }

    info!("voice-calculator stopped");

    Ok(())
}

//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::voice::{RestartPolicy, DEFAULT_STOP_PHRASE, DEFAULT_WAKE_PHRASE};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Whether the IPC server is started
    pub ipc_enabled: bool,

    /// Voice command settings
    pub voice: VoiceConfig,
}

/// Voice command settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Whether the voice controller exists at all
    pub enabled: bool,
    pub wake_phrase: String,
    pub stop_phrase: String,
    /// External command that speaks its first argument
    pub tts_command: Option<String>,
    pub restart: RestartPolicy,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup("VOICE_CALC_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lookup("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("voice-calculator")
            }
        };

        let socket_path = data_dir.join("daemon.sock");

        let defaults = RestartPolicy::default();
        let restart = RestartPolicy {
            max_attempts: parse_var(&lookup, "VOICE_CALC_RESTART_MAX_ATTEMPTS")?
                .unwrap_or(defaults.max_attempts),
            base_delay: parse_var(&lookup, "VOICE_CALC_RESTART_BASE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            max_delay: parse_var(&lookup, "VOICE_CALC_RESTART_MAX_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
        };

        let voice = VoiceConfig {
            enabled: parse_switch(&lookup, "VOICE_CALC_VOICE")?.unwrap_or(true),
            wake_phrase: phrase_var(&lookup, "VOICE_CALC_WAKE_PHRASE", DEFAULT_WAKE_PHRASE),
            stop_phrase: phrase_var(&lookup, "VOICE_CALC_STOP_PHRASE", DEFAULT_STOP_PHRASE),
            tts_command: lookup("VOICE_CALC_TTS_COMMAND").filter(|cmd| !cmd.trim().is_empty()),
            restart,
        };

        Ok(Self {
            socket_path,
            data_dir,
            ipc_enabled: parse_switch(&lookup, "VOICE_CALC_IPC")?.unwrap_or(true),
            voice,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: {value:?}"))
        })
        .transpose()
}

fn parse_switch<F>(lookup: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(Some(true)),
        "0" | "off" | "false" | "no" => Ok(Some(false)),
        other => bail!("invalid value for {key}: {other:?}"),
    }
}

fn phrase_var<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|phrase| phrase.trim().to_lowercase())
        .filter(|phrase| !phrase.is_empty())
        .unwrap_or_else(|| default.to_string())
}

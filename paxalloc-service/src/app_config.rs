use paxalloc_roster::RosterSettings;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub roster: RosterSettings,
    #[serde(default)]
    pub actor: ActorConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActorConfig {
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    #[serde(default = "default_snapshot_buffer")]
    pub snapshot_buffer: usize,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_command_buffer() -> usize { 64 }
fn default_snapshot_buffer() -> usize { 16 }
fn default_event_buffer() -> usize { 100 }

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            command_buffer: default_command_buffer(),
            snapshot_buffer: default_snapshot_buffer(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_input_path")]
    pub input_path: String,
    /// Result file; stdout when unset
    pub output_path: Option<String>,
    /// Where every intermediate snapshot is written, if anywhere
    pub snapshot_path: Option<String>,
    #[serde(default = "default_auto_fill")]
    pub auto_fill: bool,
}

fn default_input_path() -> String { "trip.json".to_string() }
fn default_auto_fill() -> bool { true }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: None,
            snapshot_path: None,
            auto_fill: default_auto_fill(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `PAXALLOC_BATCH__INPUT_PATH=trip.json`
            .add_source(config::Environment::with_prefix("PAXALLOC").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

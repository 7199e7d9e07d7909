use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use home::home_dir;
use serde::{Deserialize, Serialize};

use crate::MidiError;

/// MIDI default tempo: 500 000 µs per quarter note (120 BPM)
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Hardcoded 170 BPM used by the visualizer this decoder was first written for
pub const LEGACY_TEMPO: u32 = 352_941;

/// How tempo state flows between the tracks of a file.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoScope {
    /// Every track starts over from the initial tempo.
    #[default]
    PerTrack,
    /// Tempo changes carry over to the following tracks (format 1 tempo track).
    Shared,
}

/// How ticks are converted to seconds.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// The tempo in effect when a note completes is applied to the whole tick count.
    #[default]
    Instantaneous,
    /// Every tempo change applies from its own tick onwards.
    TempoMap,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Microseconds per quarter note before any tempo event
    pub initial_tempo: u32,
    pub tempo_scope: TempoScope,
    pub timing: TimingMode,
    /// Reuse the previous channel status when a data byte shows up in status position
    pub running_status: bool,
    /// Skip `0xF0`/`0xF7` events by their declared length
    pub skip_sysex: bool,
    /// Close notes left pending at the last tick of their track
    /// instead of the chunk's end offset
    pub close_at_last_tick: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            initial_tempo: DEFAULT_TEMPO,
            tempo_scope: TempoScope::default(),
            timing: TimingMode::default(),
            running_status: false,
            skip_sysex: false,
            close_at_last_tick: false,
        }
    }
}

impl DecodeOptions {
    pub fn validate(&self) -> Result<(), MidiError> {
        if self.initial_tempo == 0 {
            return Err(MidiError::ConfigError(
                "initial tempo must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub decode: DecodeOptions,
}

impl Config {
    // folder placed in $HOME directory
    const FOLDER: &'static str = ".midiroll";

    fn get_base_path() -> Result<PathBuf, MidiError> {
        let home = home_dir()
            .ok_or_else(|| MidiError::ConfigError("Could not find home directory".to_string()))?;
        Ok(home.join(Self::FOLDER))
    }

    pub fn default_path() -> Result<PathBuf, MidiError> {
        let base = Self::get_base_path()?;
        Ok(base.join("config.json"))
    }

    pub fn read_from(path: &Path) -> Result<Self, MidiError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader).map_err(|err| {
            MidiError::ConfigError(format!("Could not read configuration {path:?}: {err}"))
        })?;
        config.decode.validate()?;
        Ok(config)
    }

    /// Creates the parent folder if needed
    pub fn save_to(&self, path: &Path) -> Result<(), MidiError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            MidiError::ConfigError(format!("Could not save configuration {err:}"))
        })?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

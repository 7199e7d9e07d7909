use crate::AppError::ConfigError;
use clap::Parser;
use midiroll::config::Config;
use midiroll::{parse_midi_data_with, DecodeOptions, MidiError, MidiFile, TempoScope, TimingMode};
use std::io;
use std::path::PathBuf;

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("midiroll=info"))
        .init();

    // args
    let args = CliArgs::parse();
    let midi_file_path = PathBuf::from(&args.midi_file);

    // check if midi file exists
    if !midi_file_path.exists() {
        let err = ConfigError(format!("MIDI file not found {midi_file_path:?}"));
        return Err(err);
    }

    // read config, explicit path first
    let config_path = match &args.config {
        Some(config_path) => {
            let config_path = PathBuf::from(config_path);
            if !config_path.exists() && !args.save_config {
                let err = ConfigError(format!("Configuration file not found {config_path:?}"));
                return Err(err);
            }
            config_path
        }
        None => Config::default_path()?,
    };
    // no configuration file means defaults
    let config = if config_path.exists() {
        log::info!("Starting with configuration file {config_path:?}");
        Config::read_from(&config_path)?
    } else {
        Config::default()
    };
    let options = args.apply_to(config.decode);
    options.validate()?;
    log::debug!("Decode options: {options:?}");

    // persist the options the flags produced
    if args.save_config {
        Config { decode: options }.save_to(&config_path)?;
        log::info!("Configuration saved to {config_path:?}");
    }

    // go!
    let file_data = std::fs::read(&midi_file_path)?;
    let midi = parse_midi_data_with(&file_data, &options)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&midi)?);
    } else {
        print_summary(&midi);
    }
    Ok(())
}

fn print_summary(midi: &MidiFile) {
    println!(
        "format {} | division {} | {} tracks | {} notes | {:.3}s",
        midi.format,
        midi.division,
        midi.tracks.len(),
        midi.note_count(),
        midi.total_duration
    );
    for (index, track) in midi.tracks.iter().enumerate() {
        println!(
            "{index:>3}  {:<32} {:>6} notes  ends at {:.3}s",
            track.name,
            track.notes.len(),
            track.end_time()
        );
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the MIDI file to decode.
    midi_file: String,
    /// Optional path to a configuration file.
    #[arg(long)]
    config: Option<String>,
    /// Tempo in microseconds per quarter note before any tempo event.
    #[arg(long)]
    initial_tempo: Option<u32>,
    /// Carry tempo changes over to the following tracks.
    #[arg(long, default_value_t = false)]
    shared_tempo: bool,
    /// Apply each tempo change from its own tick onwards.
    #[arg(long, default_value_t = false)]
    tempo_map: bool,
    /// Accept events relying on running status.
    #[arg(long, default_value_t = false)]
    running_status: bool,
    /// Skip system exclusive events.
    #[arg(long, default_value_t = false)]
    skip_sysex: bool,
    /// Close pending notes at the last tick of their track.
    #[arg(long, default_value_t = false)]
    close_at_last_tick: bool,
    /// Save the resulting options to the configuration file.
    #[arg(long, default_value_t = false)]
    save_config: bool,
    /// Print the decoded file as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl CliArgs {
    /// Flags override the configuration file
    fn apply_to(&self, mut options: DecodeOptions) -> DecodeOptions {
        if let Some(initial_tempo) = self.initial_tempo {
            options.initial_tempo = initial_tempo;
        }
        if self.shared_tempo {
            options.tempo_scope = TempoScope::Shared;
        }
        if self.tempo_map {
            options.timing = TimingMode::TempoMap;
        }
        options.running_status |= self.running_status;
        options.skip_sysex |= self.skip_sysex;
        options.close_at_last_tick |= self.close_at_last_tick;
        options
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("parsing error: {0}")]
    ParsingError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<MidiError> for AppError {
    fn from(error: MidiError) -> Self {
        match error {
            MidiError::ConfigError(s) => Self::ConfigError(s),
            MidiError::IoError(s) => Self::OtherError(s),
            other => Self::ParsingError(other.to_string()),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::OtherError(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::OtherError(error.to_string())
    }
}

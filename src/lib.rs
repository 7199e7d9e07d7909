//! Midiroll - Standard MIDI File decoder
//!
//! This library turns the bytes of a Standard MIDI File into tracks of notes
//! with absolute start times and durations in seconds.
//!
//! # Example
//!
//! ```no_run
//! use midiroll::parse_midi_data;
//!
//! let file_data = std::fs::read("song.mid").unwrap();
//! let midi = parse_midi_data(&file_data).unwrap();
//! for note in midi.notes_active_at(1.5) {
//!     println!("{} on channel {}", note.pitch, note.channel);
//! }
//! ```

pub mod config;
pub mod error;
pub mod parser;

// Re-export main types for convenience
pub use config::{DecodeOptions, TempoScope, TimingMode, DEFAULT_TEMPO, LEGACY_TEMPO};
pub use error::MidiError;
pub use parser::midi_parser::{parse_midi_data, parse_midi_data_with, MidiFile, Note, Track};
pub use parser::note_pairing::ticks_to_seconds;

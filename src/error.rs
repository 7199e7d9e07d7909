//! Error types for the midiroll library

use std::io;

/// Library error type for midiroll operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MidiError {
    /// A read went past the end of the buffer
    #[error("unexpected end of stream at offset {offset} (requested {requested} bytes)")]
    UnexpectedEndOfStream { offset: usize, requested: usize },

    /// Missing `MThd` tag or header chunk too short
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// SMPTE division, only ticks per quarter note are supported
    #[error("unsupported time format: division {0:#06X} uses SMPTE timing")]
    UnsupportedTimeFormat(u16),

    /// Track chunk without the `MTrk` tag
    #[error("invalid track header at offset {offset}: {tag:02X?}")]
    InvalidTrackHeader { offset: usize, tag: [u8; 4] },

    /// Variable-length quantity longer than 4 bytes
    #[error("malformed variable-length value at offset {offset}")]
    MalformedValue { offset: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl MidiError {
    /// Whether the error aborts the decoding of the whole file.
    /// A bad track chunk only drops that track.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidTrackHeader { .. })
    }
}

impl From<io::Error> for MidiError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}

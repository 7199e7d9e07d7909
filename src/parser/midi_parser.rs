use crate::config::{DecodeOptions, TempoScope};
use crate::parser::header_parser::parse_header;
use crate::parser::note_pairing::TempoClock;
use crate::parser::primitive_parser::ByteCursor;
use crate::parser::track_parser::parse_track;
use crate::MidiError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    /// Seconds
    pub start_time: f64,
    /// Seconds
    pub duration: f64,
    pub channel: u8,
}

impl Note {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Sounding at `time` seconds
    pub fn is_active_at(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub name: String,
    /// In completion order, not sorted by start time
    pub notes: Vec<Note>,
}

impl Track {
    pub fn end_time(&self) -> f64 {
        self.notes.iter().map(Note::end_time).fold(0.0, f64::max)
    }
}

/// Decoded Standard MIDI File.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MidiFile {
    pub format: u16,
    /// Ticks per quarter note
    pub division: u16,
    pub tracks: Vec<Track>,
    /// End of the last note in seconds, the playback loop point
    pub total_duration: f64,
}

impl MidiFile {
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.tracks.iter().flat_map(|t| t.notes.iter())
    }

    /// Notes sounding at the playback clock `time`
    pub fn notes_active_at(&self, time: f64) -> impl Iterator<Item = &Note> {
        self.notes().filter(move |n| n.is_active_at(time))
    }

    /// Notes starting in `(from, to]`, the window a playback clock covers in one step
    pub fn notes_starting_between(&self, from: f64, to: f64) -> impl Iterator<Item = &Note> {
        self.notes().filter(move |n| from < n.start_time && n.start_time <= to)
    }
}

/// Decode a Standard MIDI File with the default options.
pub fn parse_midi_data(data: &[u8]) -> Result<MidiFile, MidiError> {
    parse_midi_data_with(data, &DecodeOptions::default())
}

/// Decode a Standard MIDI File.
///
/// Tracks with an invalid chunk tag are dropped, any other error aborts the decoding.
pub fn parse_midi_data_with(data: &[u8], options: &DecodeOptions) -> Result<MidiFile, MidiError> {
    options.validate()?;
    let mut cursor = ByteCursor::new(data);
    let header = parse_header(&mut cursor)?;
    log::info!(
        "MIDI format: {}, tracks: {}, division: {}",
        header.format,
        header.track_count,
        header.division
    );

    let new_clock = || TempoClock::new(options.initial_tempo, header.division, options.timing);
    let mut shared_clock: Option<TempoClock> = None;
    let mut tracks = Vec::with_capacity(usize::from(header.track_count));
    for index in 0..header.track_count {
        let clock = match options.tempo_scope {
            TempoScope::PerTrack => new_clock(),
            TempoScope::Shared => shared_clock.clone().unwrap_or_else(new_clock),
        };
        match parse_track(&mut cursor, options, clock) {
            Ok((track, clock)) => {
                log::debug!(
                    "Track {index} '{}' with {} notes",
                    track.name,
                    track.notes.len()
                );
                tracks.push(track);
                if options.tempo_scope == TempoScope::Shared {
                    shared_clock = Some(clock);
                }
            }
            Err(err) if !err.is_fatal() => log::warn!("Dropping track {index}: {err}"),
            Err(err) => return Err(err),
        }
    }
    if !cursor.is_exhausted() {
        log::debug!("Ignoring {} trailing bytes", cursor.remaining());
    }

    let total_duration = tracks.iter().map(Track::end_time).fold(0.0, f64::max);
    let midi_file = MidiFile {
        format: header.format,
        division: header.division,
        tracks,
        total_duration,
    };
    log::info!(
        "Successfully parsed MIDI file with {} tracks and {} notes lasting {:.3}s",
        midi_file.tracks.len(),
        midi_file.note_count(),
        midi_file.total_duration
    );
    Ok(midi_file)
}

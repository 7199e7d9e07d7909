use crate::config::DecodeOptions;
use crate::parser::midi_parser::Track;
use crate::parser::note_pairing::{NotePairing, TempoClock};
use crate::parser::primitive_parser::ByteCursor;
use crate::MidiError;

pub const TRACK_TAG: [u8; 4] = *b"MTrk";

/// Name given to tracks without a track name meta event
pub const DEFAULT_TRACK_NAME: &str = "Track";

const META_EVENT: u8 = 0xFF;
const META_TRACK_NAME: u8 = 0x03;
const META_TEMPO: u8 = 0x51;

const SYSEX_START: u8 = 0xF0;
const SYSEX_ESCAPE: u8 = 0xF7;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const POLY_PRESSURE: u8 = 0xA0;
const CONTROL_CHANGE: u8 = 0xB0;
const PITCH_BEND: u8 = 0xE0;

/// Event decoded from a track chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    TrackName(String),
    /// Microseconds per quarter note
    Tempo(u32),
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    /// Also produced by a Note On with velocity 0
    NoteOff { channel: u8, pitch: u8 },
    /// Consumed but irrelevant for note timing
    Ignored,
}

/// Reads the events of a single track chunk.
///
/// The cursor only spans the chunk, so decoding can never read past the
/// declared chunk length.
#[derive(Debug)]
pub struct TrackParser<'a> {
    chunk: ByteCursor<'a>,
    options: DecodeOptions,
    absolute_ticks: u64,
    running_status: Option<u8>,
}

impl<'a> TrackParser<'a> {
    pub const fn new(chunk: ByteCursor<'a>, options: DecodeOptions) -> Self {
        Self {
            chunk,
            options,
            absolute_ticks: 0,
            running_status: None,
        }
    }

    /// Tick reached so far
    pub const fn absolute_ticks(&self) -> u64 {
        self.absolute_ticks
    }

    /// Next event with its absolute tick, `None` once the chunk is consumed.
    pub fn next_event(&mut self) -> Result<Option<(u64, TrackEvent)>, MidiError> {
        if self.chunk.is_exhausted() {
            return Ok(None);
        }
        let delta = self.chunk.read_variable_length()?;
        self.absolute_ticks += u64::from(delta);

        let status = self.chunk.read_u8()?;
        let event = match status {
            META_EVENT => {
                self.running_status = None;
                self.parse_meta_event()?
            }
            SYSEX_START | SYSEX_ESCAPE if self.options.skip_sysex => {
                self.running_status = None;
                let length = self.chunk.read_variable_length()?;
                log::debug!("Skipping sysex event of {length} bytes");
                self.chunk.skip(length as usize)?;
                TrackEvent::Ignored
            }
            0x80..=0xEF => {
                self.running_status = Some(status);
                self.parse_channel_event(status, None)?
            }
            0x00..=0x7F if self.options.running_status => match self.running_status {
                Some(running) => self.parse_channel_event(running, Some(status))?,
                None => {
                    log::warn!("Data byte {status:02X} without running status");
                    TrackEvent::Ignored
                }
            },
            _ => {
                log::warn!("Unknown status byte: {status:02X}");
                TrackEvent::Ignored
            }
        };
        Ok(Some((self.absolute_ticks, event)))
    }

    fn parse_meta_event(&mut self) -> Result<TrackEvent, MidiError> {
        let meta_type = self.chunk.read_u8()?;
        let length = self.chunk.read_variable_length()? as usize;
        match meta_type {
            META_TRACK_NAME => {
                let name = self.chunk.read_string(length)?;
                log::debug!("Track name:{name}");
                Ok(TrackEvent::TrackName(name))
            }
            META_TEMPO if length == 3 => {
                let tempo = self.chunk.read_u24_be()?;
                log::debug!("Tempo:{tempo} at tick {}", self.absolute_ticks);
                Ok(TrackEvent::Tempo(tempo))
            }
            META_TEMPO => {
                log::warn!("Ignoring tempo event with length {length}");
                self.chunk.skip(length)?;
                Ok(TrackEvent::Ignored)
            }
            _ => {
                log::debug!("Skipping meta event {meta_type:02X}");
                self.chunk.skip(length)?;
                Ok(TrackEvent::Ignored)
            }
        }
    }

    /// `first_data` holds the data byte already read under running status.
    fn parse_channel_event(
        &mut self,
        status: u8,
        mut first_data: Option<u8>,
    ) -> Result<TrackEvent, MidiError> {
        let channel = status & 0x0F;
        let mut data = |chunk: &mut ByteCursor<'a>| match first_data.take() {
            Some(byte) => Ok(byte),
            None => chunk.read_u8(),
        };
        let event = match status & 0xF0 {
            NOTE_ON => {
                let pitch = data(&mut self.chunk)?;
                let velocity = data(&mut self.chunk)?;
                if velocity == 0 {
                    TrackEvent::NoteOff { channel, pitch }
                } else {
                    TrackEvent::NoteOn {
                        channel,
                        pitch,
                        velocity,
                    }
                }
            }
            NOTE_OFF => {
                let pitch = data(&mut self.chunk)?;
                let _velocity = data(&mut self.chunk)?;
                TrackEvent::NoteOff { channel, pitch }
            }
            POLY_PRESSURE | CONTROL_CHANGE | PITCH_BEND => {
                data(&mut self.chunk)?;
                data(&mut self.chunk)?;
                TrackEvent::Ignored
            }
            // program change & channel pressure
            _ => {
                data(&mut self.chunk)?;
                TrackEvent::Ignored
            }
        };
        Ok(event)
    }
}

/// Decode the track chunk under the cursor.
///
/// Returns the track along with the tempo state it ended with.
/// Notes still pending at the end of the chunk are closed at the chunk's
/// absolute end offset, or at the last tick reached with
/// [`DecodeOptions::close_at_last_tick`].
/// A chunk without the `MTrk` tag is skipped by its declared length and
/// reported as [`MidiError::InvalidTrackHeader`].
pub fn parse_track(
    cursor: &mut ByteCursor<'_>,
    options: &DecodeOptions,
    clock: TempoClock,
) -> Result<(Track, TempoClock), MidiError> {
    let offset = cursor.offset();
    let tag = cursor.read_tag()?;
    let length = cursor.read_u32_be()? as usize;
    if tag != TRACK_TAG {
        cursor.skip(length)?;
        return Err(MidiError::InvalidTrackHeader { offset, tag });
    }
    log::debug!("Parsing track chunk at {offset} of {length} bytes");

    let chunk = cursor.sub_cursor(length)?;
    let end_offset = chunk.end_offset() as u64;
    let mut parser = TrackParser::new(chunk, *options);
    let mut pairing = NotePairing::new(clock);
    let mut name = None;
    loop {
        let (tick, event) = match parser.next_event() {
            Ok(Some(timed_event)) => timed_event,
            Ok(None) => break,
            Err(MidiError::UnexpectedEndOfStream { offset, requested }) => {
                log::warn!(
                    "Event at offset {offset} needs {requested} bytes past the end of its track chunk, dropping it"
                );
                break;
            }
            Err(err) => return Err(err),
        };
        match event {
            TrackEvent::TrackName(track_name) => name = Some(track_name),
            TrackEvent::Tempo(tempo) => pairing.set_tempo(tick, tempo),
            TrackEvent::NoteOn { channel, pitch, .. } => pairing.note_on(channel, pitch, tick),
            TrackEvent::NoteOff { channel, pitch } => pairing.note_off(channel, pitch, tick),
            TrackEvent::Ignored => {}
        }
    }

    // pending notes end at the declared end offset of the chunk, read as a tick
    let closing_tick = if options.close_at_last_tick {
        parser.absolute_ticks()
    } else {
        end_offset
    };
    let (notes, clock) = pairing.finish(closing_tick);
    let track = Track {
        name: name.unwrap_or_else(|| DEFAULT_TRACK_NAME.to_string()),
        notes,
    };
    Ok((track, clock))
}

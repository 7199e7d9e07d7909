use crate::config::TimingMode;
use crate::parser::midi_parser::Note;
use std::collections::BTreeMap;

/// Every decoded note gets the maximum velocity
pub const NOTE_VELOCITY: u8 = 127;

/// Convert ticks to seconds.
/// `tempo` is in microseconds per quarter note, `division` in ticks per quarter note.
pub fn ticks_to_seconds(ticks: u64, tempo: u32, division: u16) -> f64 {
    (ticks as f64 * f64::from(tempo)) / (1_000_000.0 * f64::from(division))
}

/// Running tempo state used to place ticks on the time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempoClock {
    mode: TimingMode,
    division: u16,
    tempo: u32,
    // (tick, tempo) sorted by tick, always starts at tick 0
    changes: Vec<(u64, u32)>,
}

impl TempoClock {
    pub fn new(initial_tempo: u32, division: u16, mode: TimingMode) -> Self {
        Self {
            mode,
            division,
            tempo: initial_tempo,
            changes: vec![(0, initial_tempo)],
        }
    }

    /// Tempo set by the latest tempo event
    pub const fn tempo(&self) -> u32 {
        self.tempo
    }

    pub fn changes(&self) -> &[(u64, u32)] {
        &self.changes
    }

    pub fn set_tempo(&mut self, tick: u64, tempo: u32) {
        self.tempo = tempo;
        let index = self.changes.partition_point(|&(t, _)| t <= tick);
        if index > 0 && self.changes[index - 1].0 == tick {
            self.changes[index - 1].1 = tempo;
        } else {
            self.changes.insert(index, (tick, tempo));
        }
    }

    pub fn seconds_at(&self, tick: u64) -> f64 {
        match self.mode {
            TimingMode::Instantaneous => ticks_to_seconds(tick, self.tempo, self.division),
            TimingMode::TempoMap => {
                let mut seconds = 0.0;
                for (i, &(start, tempo)) in self.changes.iter().enumerate() {
                    if start >= tick {
                        break;
                    }
                    let end = self
                        .changes
                        .get(i + 1)
                        .map_or(tick, |&(next, _)| next.min(tick));
                    seconds += ticks_to_seconds(end - start, tempo, self.division);
                }
                seconds
            }
        }
    }
}

/// Pairs Note On with Note Off events for a single track.
///
/// At most one pending Note On exists per (channel, pitch).
#[derive(Debug)]
pub struct NotePairing {
    clock: TempoClock,
    active: BTreeMap<(u8, u8), u64>,
    notes: Vec<Note>,
}

impl NotePairing {
    pub const fn new(clock: TempoClock) -> Self {
        Self {
            clock,
            active: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.active.len()
    }

    pub fn set_tempo(&mut self, tick: u64, tempo: u32) {
        self.clock.set_tempo(tick, tempo);
    }

    pub fn note_on(&mut self, channel: u8, pitch: u8, tick: u64) {
        if let Some(previous) = self.active.insert((channel, pitch), tick) {
            log::debug!(
                "Note on channel:{channel} pitch:{pitch} at {tick} replaces pending one from {previous}"
            );
        }
    }

    pub fn note_off(&mut self, channel: u8, pitch: u8, tick: u64) {
        let Some(on_tick) = self.active.remove(&(channel, pitch)) else {
            log::debug!("Ignoring unmatched note off channel:{channel} pitch:{pitch} at {tick}");
            return;
        };
        self.emit(channel, pitch, on_tick, tick);
    }

    fn emit(&mut self, channel: u8, pitch: u8, on_tick: u64, off_tick: u64) {
        let start_time = self.clock.seconds_at(on_tick);
        let end_time = self.clock.seconds_at(off_tick);
        self.notes.push(Note {
            pitch,
            velocity: NOTE_VELOCITY,
            start_time,
            duration: (end_time - start_time).max(0.0),
            channel,
        });
    }

    /// Close every pending note at `end_tick`, in (channel, pitch) order.
    pub fn finish(mut self, end_tick: u64) -> (Vec<Note>, TempoClock) {
        let pending = std::mem::take(&mut self.active);
        if !pending.is_empty() {
            log::debug!("Closing {} pending notes at {end_tick}", pending.len());
        }
        for ((channel, pitch), on_tick) in pending {
            self.emit(channel, pitch, on_tick, end_tick);
        }
        (self.notes, self.clock)
    }
}

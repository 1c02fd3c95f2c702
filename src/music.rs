// Windchime
// Copyright (C) 2026  The Windchime Developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Wind driven chime gestures.
//!
//! A chime is modeled as a ring of tubes, described by a [`ChimeScale`]. A gust of wind swings the
//! striker across a contiguous arc of neighbouring tubes, so a [`Gesture`] is a short circular walk
//! around the ring starting from a random tube in a random direction. Only a random prefix of the
//! walk is actually played, which means that some gestures are silent.
//!
//! Wind speed shapes the result in two ways:
//!
//! * [`amplitude`] - every note of a gesture is struck equally hard, louder in stronger wind.
//! * [`gesture_delay_base`] - gestures follow each other faster in stronger wind. In calm air the
//!   chime rests for [`CALM_DELAY`] between gestures.
//!
//! All randomness comes from the [`Rng`] owned by a [`Generator`], so a generator built from a
//! seeded rng produces a reproducible performance.
//!
//! # Examples
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use windchime::music::{ChimeScale, Generator, Note, Preset};
//! use std::time::Duration;
//!
//! let scale = ChimeScale::preset(Preset::Pentatonic, Note::new(60)?, 0, 8)?;
//! let mut generator = Generator::new(StdRng::seed_from_u64(7));
//!
//! let gesture = generator.generate_gesture(&scale, 12.0);
//! let mut struck = Vec::new();
//! let mut voice = |note: Note, amplitude: f32| struck.push((note, amplitude));
//! let mut sleeper = |_: Duration| {};
//! let delay = generator.render(&scale, &gesture, &mut voice, &mut sleeper);
//!
//! assert_eq!(struck.len(), gesture.play_count());
//! assert!(delay < Duration::from_secs(3));
//! # windchime::music::Result::Ok(())
//! ```

use crate::{clock::Sleeper, voice::ChimeVoice};
use rand::Rng;
use serde::Deserialize;
use std::{convert::TryFrom, fmt, str::FromStr, time::Duration};
use thiserror::Error;

/// A specialized [`Result`] type for scale construction errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when building notes and scales.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("a chime scale needs at least one note")]
    EmptyScale,
    #[error("MIDI note {0} is out of range 0..=127")]
    NoteOutOfRange(u32),
    #[error("unknown scale preset {0:?}")]
    UnknownPreset(String),
}

/// Wind speeds at or above this saturate [`amplitude`] and [`gesture_delay_base`].
pub const MAX_WIND_MPH: f32 = 50.0;

/// Wind speeds below this are calm.
pub const CALM_WIND_MPH: f32 = 1.0;

/// The pause between gestures in calm air.
pub const CALM_DELAY: Duration = Duration::from_secs(30);

const MIN_AMPLITUDE: f32 = 0.4;
const MAX_AMPLITUDE: f32 = 1.0;

// Gesture delays run from slowest in light wind to fastest in strong wind.
const SLOWEST_DELAY_SECS: f32 = 2.0;
const FASTEST_DELAY_SECS: f32 = 0.01;
const MAX_JITTER_SECS: f32 = 0.5;

const MIN_NOTE_GAP_SECS: f32 = 0.10;
const MAX_NOTE_GAP_SECS: f32 = 0.50;

const SWEEP_NOTE_GAP: Duration = Duration::from_millis(400);
const SWEEP_SETTLE: Duration = Duration::from_secs(1);

/// A MIDI note number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Note(u8);

impl Note {
    /// Create a note from a MIDI note number.
    ///
    /// # Errors
    ///
    /// Returns an error if `midi` is greater than 127.
    pub fn new(midi: u32) -> Result<Note> {
        if midi > 127 {
            return Err(Error::NoteOutOfRange(midi));
        }
        Ok(Note(midi as u8))
    }

    pub fn midi(self) -> u8 {
        self.0
    }

    /// The frequency of the note in hertz, using A4 = 440Hz.
    pub fn frequency(self) -> f32 {
        let exp = (f32::from(self.0) - 69.0) / 12.0;
        440.0 * 2f32.powf(exp)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "midi {}", self.0)
    }
}

/// Named scales a chime can be tuned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Phrygian dominant, the mode of the Hava Nagila melody.
    HavaNagila,
    Pentatonic,
    Major,
    Minor,
    WholeTone,
}

impl Preset {
    /// Semitone offsets of each scale degree within one octave.
    fn intervals(self) -> &'static [u32] {
        match self {
            Preset::HavaNagila => &[0, 1, 4, 5, 7, 8, 10],
            Preset::Pentatonic => &[0, 2, 4, 7, 9],
            Preset::Major => &[0, 2, 4, 5, 7, 9, 11],
            Preset::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Preset::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(name: &str) -> Result<Preset> {
        match name {
            "hava_nagila" => Ok(Preset::HavaNagila),
            "pentatonic" => Ok(Preset::Pentatonic),
            "major" => Ok(Preset::Major),
            "minor" => Ok(Preset::Minor),
            "whole_tone" => Ok(Preset::WholeTone),
            _ => Err(Error::UnknownPreset(name.to_owned())),
        }
    }
}

/// The notes of a chime's tubes, in the order they hang around the ring.
///
/// A scale always has at least one note. Positions wrap around the end of the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChimeScale {
    notes: Vec<Note>,
}

impl ChimeScale {
    /// Create a scale from an explicit list of notes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyScale`] if `notes` is empty.
    pub fn new(notes: Vec<Note>) -> Result<ChimeScale> {
        if notes.is_empty() {
            return Err(Error::EmptyScale);
        }
        Ok(ChimeScale { notes })
    }

    /// Build a scale of `tubes` notes from a preset.
    ///
    /// # Arguments
    ///
    /// * `root` - The note of the preset's first degree.
    /// * `offset` - The number of scale degrees above `root` of the first tube.
    /// * `tubes` - The number of notes in the scale. The preset repeats an octave higher as
    ///   needed.
    ///
    /// # Errors
    ///
    /// Returns an error if `tubes` is zero or if any tube would be above MIDI note 127. Degrees
    /// too large to name a MIDI note are reported as `NoteOutOfRange(u32::MAX)`.
    pub fn preset(preset: Preset, root: Note, offset: usize, tubes: usize) -> Result<ChimeScale> {
        let too_high = Error::NoteOutOfRange(u32::MAX);
        let intervals = preset.intervals();
        let end = offset.checked_add(tubes).ok_or_else(|| too_high.clone())?;
        let notes = (offset..end)
            .map(|degree| {
                let interval = intervals[degree % intervals.len()];
                u32::try_from(degree / intervals.len())
                    .ok()
                    .and_then(|octave| octave.checked_mul(12))
                    .and_then(|semitones| semitones.checked_add(u32::from(root.midi()) + interval))
                    .ok_or_else(|| too_high.clone())
                    .and_then(Note::new)
            })
            .collect::<Result<Vec<_>>>()?;
        ChimeScale::new(notes)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Always false, a scale cannot be empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Returns the note at `position`, wrapping around the ring.
    pub fn note(&self, position: usize) -> Note {
        self.notes[position % self.notes.len()]
    }
}

/// Which way a gesture walks around the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn step(self) -> isize {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// Returns the positions of a walk of `len / 2` steps around a ring of `len` tubes.
///
/// The walk starts at `start` and moves one tube at a time in `direction`, wrapping at the ends.
/// Rings of fewer than two tubes produce an empty walk.
pub fn circular_walk(len: usize, start: usize, direction: Direction) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let ring = len as isize;
    let start = (start % len) as isize;
    (0..len / 2)
        .map(|step| (start + step as isize * direction.step()).rem_euclid(ring) as usize)
        .collect()
}

/// One sequence of strikes produced from a single wind speed sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    indices: Vec<usize>,
    play_count: usize,
    wind_speed: f32,
}

impl Gesture {
    /// Create a gesture that plays the first `play_count` positions of `indices`.
    ///
    /// `play_count` is limited to the length of `indices`.
    pub fn new(indices: Vec<usize>, play_count: usize, wind_speed: f32) -> Gesture {
        let play_count = play_count.min(indices.len());
        Gesture {
            indices,
            play_count,
            wind_speed,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn play_count(&self) -> usize {
        self.play_count
    }

    pub fn wind_speed(&self) -> f32 {
        self.wind_speed
    }

    /// The amplitude shared by every note in the gesture.
    pub fn amplitude(&self) -> f32 {
        amplitude(self.wind_speed)
    }

    /// The notes this gesture strikes, in order.
    pub fn notes<'a>(&'a self, scale: &'a ChimeScale) -> impl Iterator<Item = Note> + 'a {
        self.indices[..self.play_count]
            .iter()
            .map(move |position| scale.note(*position))
    }
}

/// Linearly maps `value` from `in_min..=in_max` onto `out_min..=out_max`.
///
/// Values outside the input range saturate at the ends of the output range. The output range may
/// be decreasing.
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    if in_max == in_min {
        return out_min;
    }
    let t = ((value - in_min) / (in_max - in_min)).max(0.0).min(1.0);
    out_min + t * (out_max - out_min)
}

/// The strike amplitude for a wind speed, from 0.4 in still air to 1.0 at 50mph and above.
pub fn amplitude(wind_speed: f32) -> f32 {
    map_range(wind_speed, 0.0, MAX_WIND_MPH, MIN_AMPLITUDE, MAX_AMPLITUDE)
}

pub fn is_calm(wind_speed: f32) -> bool {
    wind_speed < CALM_WIND_MPH
}

/// The pause after a gesture before random jitter is added.
///
/// Calm air always rests for [`CALM_DELAY`]. Otherwise the delay shrinks from 2s toward 10ms as
/// the wind approaches 50mph.
pub fn gesture_delay_base(wind_speed: f32) -> Duration {
    if is_calm(wind_speed) {
        return CALM_DELAY;
    }
    Duration::from_secs_f32(map_range(
        wind_speed,
        0.0,
        MAX_WIND_MPH,
        SLOWEST_DELAY_SECS,
        FASTEST_DELAY_SECS,
    ))
}

/// Strikes every note of the scale in order at full amplitude.
///
/// Used at power-on so the chime can be heard to be working.
pub fn sweep<V, S>(scale: &ChimeScale, voice: &mut V, sleeper: &mut S)
where
    V: ChimeVoice + ?Sized,
    S: Sleeper + ?Sized,
{
    for note in scale.notes() {
        voice.strike(*note, MAX_AMPLITUDE);
        sleeper.sleep(SWEEP_NOTE_GAP);
    }
    sleeper.sleep(SWEEP_SETTLE);
}

/// Generates and plays gestures using a source of randomness.
#[derive(Debug)]
pub struct Generator<R> {
    rng: R,
}

impl<R: Rng> Generator<R> {
    pub fn new(rng: R) -> Generator<R> {
        Generator { rng }
    }

    /// Generate one gesture for the current wind speed.
    ///
    /// The walk covers half the ring from a uniformly random start in a uniformly random
    /// direction. Between zero and all of its positions are played, uniformly.
    pub fn generate_gesture(&mut self, scale: &ChimeScale, wind_speed: f32) -> Gesture {
        let start = self.rng.gen_range(0..scale.len());
        let direction = if self.rng.gen_bool(0.5) {
            Direction::Ascending
        } else {
            Direction::Descending
        };
        let indices = circular_walk(scale.len(), start, direction);
        let play_count = self.rng.gen_range(0..=indices.len());
        log::trace!(
            "gesture from {} {:?}: {:?}, playing {}",
            start,
            direction,
            indices,
            play_count
        );
        Gesture::new(indices, play_count, wind_speed)
    }

    /// Play a gesture and return how long to wait before the next one.
    ///
    /// Each strike is followed by a pause drawn uniformly from 100ms to 500ms.
    pub fn render<V, S>(
        &mut self,
        scale: &ChimeScale,
        gesture: &Gesture,
        voice: &mut V,
        sleeper: &mut S,
    ) -> Duration
    where
        V: ChimeVoice + ?Sized,
        S: Sleeper + ?Sized,
    {
        let amplitude = gesture.amplitude();
        for note in gesture.notes(scale) {
            voice.strike(note, amplitude);
            let gap = self.rng.gen_range(MIN_NOTE_GAP_SECS..MAX_NOTE_GAP_SECS);
            sleeper.sleep(Duration::from_secs_f32(gap));
        }
        self.gesture_delay(gesture.wind_speed())
    }

    /// The pause before the next gesture, [`gesture_delay_base`] plus up to 500ms of jitter.
    ///
    /// Calm air gets no jitter.
    pub fn gesture_delay(&mut self, wind_speed: f32) -> Duration {
        let base = gesture_delay_base(wind_speed);
        if is_calm(wind_speed) {
            return base;
        }
        let jitter = self.rng.gen_range(0.0..MAX_JITTER_SECS);
        base + Duration::from_secs_f32(jitter)
    }
}

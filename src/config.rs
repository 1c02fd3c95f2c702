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

//! Device configuration.
//!
//! Configuration is read from a JSON file. Every field is optional and falls back to the values
//! the chime was originally tuned with:
//!
//! ```json
//! {
//!     "tasks": {
//!         "heartbeat": { "cycle_seconds": 2, "offset_seconds": 0 },
//!         "clock": { "cycle_seconds": 60, "offset_seconds": 0 },
//!         "chimes": { "cycle_seconds": 3, "offset_seconds": 0 },
//!         "weather": { "cycle_seconds": 1200, "offset_seconds": 720 }
//!     },
//!     "scale": { "preset": "hava_nagila", "root": 60, "offset": 5, "tubes": 8 },
//!     "loudness": 0.4,
//!     "led_brightness": 0.15,
//!     "tz_offset_hours": -7,
//!     "chime_on_refresh": true,
//!     "synth": { "address": "127.0.0.1:57110", "synthdef": "chime" },
//!     "weather": { "file": { "path": "/var/lib/windchime/observation.json", "format": "openweathermap" } },
//!     "seed": null
//! }
//! ```
//!
//! A scale can also be given as explicit MIDI notes, `"scale": { "notes": [60, 62, 64] }`, and the
//! weather can be made up with `"weather": "offline"`.

use crate::{
    music::{self, ChimeScale, Note, Preset},
    scheduler::{self, TaskDescriptor},
    weather::Format,
};
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// A specialized [`Result`] type for configuration errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when configuration cannot be loaded.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scale: {0}")]
    Scale(#[from] music::Error),
    #[error("invalid task: {0}")]
    Task(#[from] scheduler::Error),
    #[error("{name} must be between 0 and 1, got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub tasks: TaskSchedule,
    pub scale: ScaleConfig,
    /// Multiplies every strike's amplitude.
    pub loudness: f32,
    pub led_brightness: f32,
    pub tz_offset_hours: i32,
    /// Strike the first tube whenever the weather is refreshed.
    pub chime_on_refresh: bool,
    pub synth: SynthConfig,
    pub weather: WeatherConfig,
    /// Seeds the random number generators for a repeatable performance.
    pub seed: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> DeviceConfig {
        DeviceConfig {
            tasks: TaskSchedule::default(),
            scale: ScaleConfig::default(),
            loudness: 0.4,
            led_brightness: 0.15,
            tz_offset_hours: -7,
            chime_on_refresh: true,
            synth: SynthConfig::default(),
            weather: WeatherConfig::default(),
            seed: None,
        }
    }
}

impl DeviceConfig {
    /// Load and validate configuration from a file.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<DeviceConfig> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => DeviceConfig::from_json(&json),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.display());
                Ok(DeviceConfig::default())
            }
            Err(source) => Err(Error::Io {
                path: path.to_owned(),
                source,
            }),
        }
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<DeviceConfig> {
        let config: DeviceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that would otherwise fail once the device is running.
    pub fn validate(&self) -> Result<()> {
        self.tasks.descriptors()?;
        self.scale.build()?;
        unit_range("loudness", self.loudness)?;
        unit_range("led_brightness", self.led_brightness)?;
        Ok(())
    }
}

fn unit_range(name: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::OutOfUnitRange { name, value })
    }
}

/// When a task is due: whenever `now % cycle_seconds == offset_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TaskTiming {
    pub cycle_seconds: u64,
    #[serde(default)]
    pub offset_seconds: u64,
}

impl TaskTiming {
    pub const fn new(cycle_seconds: u64, offset_seconds: u64) -> TaskTiming {
        TaskTiming {
            cycle_seconds,
            offset_seconds,
        }
    }

    pub fn descriptor(self, title: &str) -> scheduler::Result<TaskDescriptor> {
        TaskDescriptor::new(title, self.cycle_seconds, self.offset_seconds)
    }
}

pub const HEARTBEAT_TITLE: &str = "heartbeat";
pub const CLOCK_TITLE: &str = "display clock";
pub const CHIMES_TITLE: &str = "play wind-related chimes";
pub const WEATHER_TITLE: &str = "update clock and weather";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskSchedule {
    pub heartbeat: TaskTiming,
    pub clock: TaskTiming,
    pub chimes: TaskTiming,
    pub weather: TaskTiming,
}

impl Default for TaskSchedule {
    fn default() -> TaskSchedule {
        TaskSchedule {
            heartbeat: TaskTiming::new(2, 0),
            clock: TaskTiming::new(60, 0),
            chimes: TaskTiming::new(3, 0),
            // Every twenty minutes, twelve minutes into the cycle.
            weather: TaskTiming::new(20 * 60, 12 * 60),
        }
    }
}

/// Validated descriptors for every task, in the order they run within a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptors {
    pub heartbeat: TaskDescriptor,
    pub clock: TaskDescriptor,
    pub chimes: TaskDescriptor,
    pub weather: TaskDescriptor,
}

impl TaskSchedule {
    pub fn descriptors(&self) -> scheduler::Result<Descriptors> {
        Ok(Descriptors {
            heartbeat: self.heartbeat.descriptor(HEARTBEAT_TITLE)?,
            clock: self.clock.descriptor(CLOCK_TITLE)?,
            chimes: self.chimes.descriptor(CHIMES_TITLE)?,
            weather: self.weather.descriptor(WEATHER_TITLE)?,
        })
    }
}

fn default_root() -> u32 {
    60
}

fn default_offset() -> usize {
    5
}

fn default_tubes() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScaleConfig {
    Notes {
        notes: Vec<u32>,
    },
    Preset {
        preset: Preset,
        #[serde(default = "default_root")]
        root: u32,
        #[serde(default = "default_offset")]
        offset: usize,
        #[serde(default = "default_tubes")]
        tubes: usize,
    },
}

impl Default for ScaleConfig {
    fn default() -> ScaleConfig {
        ScaleConfig::Preset {
            preset: Preset::HavaNagila,
            root: default_root(),
            offset: default_offset(),
            tubes: default_tubes(),
        }
    }
}

impl ScaleConfig {
    pub fn build(&self) -> music::Result<ChimeScale> {
        match self {
            ScaleConfig::Notes { notes } => {
                let notes = notes
                    .iter()
                    .map(|midi| Note::new(*midi))
                    .collect::<music::Result<Vec<_>>>()?;
                ChimeScale::new(notes)
            }
            ScaleConfig::Preset {
                preset,
                root,
                offset,
                tubes,
            } => ChimeScale::preset(*preset, Note::new(*root)?, *offset, *tubes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// UDP address of the SuperCollider server.
    pub address: String,
    pub synthdef: String,
}

impl Default for SynthConfig {
    fn default() -> SynthConfig {
        SynthConfig {
            address: "127.0.0.1:57110".to_owned(),
            synthdef: "chime".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherConfig {
    Offline,
    File { path: PathBuf, format: Format },
}

impl Default for WeatherConfig {
    fn default() -> WeatherConfig {
        WeatherConfig::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(DeviceConfig::from_json("{}").unwrap(), DeviceConfig::default());
    }

    #[test]
    fn default_scale_is_eight_tubes() {
        let scale = DeviceConfig::default().scale.build().unwrap();
        assert_eq!(scale.len(), 8);
    }

    #[test]
    fn parses_every_field() {
        let config = DeviceConfig::from_json(
            r#"{
                "tasks": {
                    "chimes": { "cycle_seconds": 11 },
                    "weather": { "cycle_seconds": 600, "offset_seconds": 30 }
                },
                "scale": { "notes": [72, 74, 76] },
                "loudness": 0.8,
                "led_brightness": 1.0,
                "tz_offset_hours": 2,
                "chime_on_refresh": false,
                "synth": { "address": "10.0.0.2:57110" },
                "weather": { "file": { "path": "/tmp/obs.json", "format": "weather_gov" } },
                "seed": 42
            }"#,
        )
        .unwrap();

        assert_eq!(config.tasks.chimes, TaskTiming::new(11, 0));
        assert_eq!(config.tasks.weather, TaskTiming::new(600, 30));
        assert_eq!(config.tasks.heartbeat, TaskTiming::new(2, 0));
        assert_eq!(
            config.scale,
            ScaleConfig::Notes {
                notes: vec![72, 74, 76]
            }
        );
        assert_eq!(config.loudness, 0.8);
        assert_eq!(config.tz_offset_hours, 2);
        assert!(!config.chime_on_refresh);
        assert_eq!(config.synth.address, "10.0.0.2:57110");
        assert_eq!(config.synth.synthdef, "chime");
        assert_eq!(
            config.weather,
            WeatherConfig::File {
                path: PathBuf::from("/tmp/obs.json"),
                format: Format::WeatherGov,
            }
        );
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn preset_scale_fills_in_defaults() {
        let config = DeviceConfig::from_json(r#"{"scale": {"preset": "pentatonic"}}"#).unwrap();
        assert_eq!(
            config.scale,
            ScaleConfig::Preset {
                preset: Preset::Pentatonic,
                root: 60,
                offset: 5,
                tubes: 8,
            }
        );
        assert_eq!(
            DeviceConfig::from_json(r#"{"weather": "offline"}"#)
                .unwrap()
                .weather,
            WeatherConfig::Offline
        );
    }

    #[test]
    fn rejects_zero_cycle() {
        let err = DeviceConfig::from_json(r#"{"tasks": {"clock": {"cycle_seconds": 0}}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Task(scheduler::Error::ZeroCycle { .. })));
    }

    #[test]
    fn rejects_empty_scale() {
        let err = DeviceConfig::from_json(r#"{"scale": {"notes": []}}"#).unwrap_err();
        assert!(matches!(err, Error::Scale(music::Error::EmptyScale)));
    }

    #[test]
    fn rejects_loud_voices() {
        let err = DeviceConfig::from_json(r#"{"loudness": 1.5}"#).unwrap_err();
        assert_eq!(err.to_string(), "loudness must be between 0 and 1, got 1.5");
    }

    #[test]
    fn load_from_disk() {
        let dir = TempDir::new("windchime-config").unwrap();
        let path = dir.path().join("windchime.json");
        assert_eq!(DeviceConfig::load(&path).unwrap(), DeviceConfig::default());

        fs::File::create(&path)
            .unwrap()
            .write_all(br#"{"tz_offset_hours": 1}"#)
            .unwrap();
        assert_eq!(DeviceConfig::load(&path).unwrap().tz_offset_hours, 1);

        fs::File::create(&path)
            .unwrap()
            .write_all(b"{not json")
            .unwrap();
        assert!(matches!(DeviceConfig::load(&path), Err(Error::Parse(_))));
    }
}

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

//! The wind speed status lamp and the busy LED.

use smart_leds::{brightness, RGB8};
use thiserror::Error;

/// The error type returned when building a [`WindColorTable`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("a wind color table needs at least one entry")]
    EmptyTable,
}

/// Shown while the device starts up.
pub const INITIALIZING: RGB8 = RGB8 {
    r: 0xFF,
    g: 0xFF,
    b: 0x00,
};

pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Converts a `0xRRGGBB` value to a color.
pub const fn hex(rgb: u32) -> RGB8 {
    RGB8 {
        r: (rgb >> 16) as u8,
        g: (rgb >> 8) as u8,
        b: rgb as u8,
    }
}

/// Wind speed color bands from the NOAA "Estimating Wind Speed" chart.
const NOAA: [(f32, u32); 13] = [
    (0.0, 0x0065CC),
    (1.0, 0x3365FF),
    (4.0, 0x33CCFF),
    (8.0, 0x00FFFF),
    (13.0, 0x33FFCC),
    (19.0, 0x00CC00),
    (25.0, 0x01FF00),
    (32.0, 0xFFFFCC),
    (39.0, 0xFFFF00),
    (47.0, 0xFFCC65),
    (55.0, 0xFF9A00),
    (64.0, 0xFF6565),
    (75.0, 0xFF65FF),
];

/// Maps wind speeds to colors.
///
/// Each entry is the minimum speed in miles per hour at which its color applies. The entry with
/// the greatest minimum not above the wind speed wins.
#[derive(Debug, Clone, PartialEq)]
pub struct WindColorTable {
    entries: Vec<(f32, RGB8)>,
}

impl Default for WindColorTable {
    /// The NOAA wind speed colors.
    fn default() -> WindColorTable {
        WindColorTable {
            entries: NOAA.iter().map(|(mph, rgb)| (*mph, hex(*rgb))).collect(),
        }
    }
}

impl WindColorTable {
    /// Create a table from `(min_speed_mph, color)` entries in any order.
    ///
    /// # Errors
    ///
    /// Returns an error if `entries` is empty.
    pub fn new(mut entries: Vec<(f32, RGB8)>) -> Result<WindColorTable, Error> {
        if entries.is_empty() {
            return Err(Error::EmptyTable);
        }
        entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(WindColorTable { entries })
    }

    /// The color for a wind speed.
    ///
    /// Speeds below the first entry get the first entry's color.
    pub fn select(&self, wind_speed: f32) -> RGB8 {
        self.entries
            .iter()
            .rev()
            .find(|(min, _)| *min <= wind_speed)
            .unwrap_or(&self.entries[0])
            .1
    }
}

/// A single RGB status lamp.
///
/// A blanket implementation is provided for closures implementing `FnMut(RGB8)`.
pub trait IndicatorLamp {
    fn set_color(&mut self, color: RGB8);
}

impl<F> IndicatorLamp for F
where
    F: FnMut(RGB8),
{
    fn set_color(&mut self, color: RGB8) {
        self(color)
    }
}

/// A single on/off LED.
///
/// A blanket implementation is provided for closures implementing `FnMut(bool)`.
pub trait StatusLed {
    fn set(&mut self, on: bool);
}

impl<F> StatusLed for F
where
    F: FnMut(bool),
{
    fn set(&mut self, on: bool) {
        self(on)
    }
}

/// Reports lamp colors through the log, dimmed to the lamp's brightness.
#[derive(Debug, Clone)]
pub struct LogIndicator {
    brightness: u8,
    current: RGB8,
}

impl LogIndicator {
    /// `level` is the lamp brightness from 0.0 to 1.0.
    pub fn new(level: f32) -> LogIndicator {
        LogIndicator {
            brightness: (level.max(0.0).min(1.0) * 255.0).round() as u8,
            current: OFF,
        }
    }

    /// The color last written to the lamp, after dimming.
    pub fn current(&self) -> RGB8 {
        self.current
    }
}

impl IndicatorLamp for LogIndicator {
    fn set_color(&mut self, color: RGB8) {
        let dimmed = brightness(std::iter::once(color), self.brightness)
            .next()
            .unwrap_or(OFF);
        if dimmed != self.current {
            log::info!(
                "lamp #{:02X}{:02X}{:02X} (#{:02X}{:02X}{:02X} at full brightness)",
                dimmed.r,
                dimmed.g,
                dimmed.b,
                color.r,
                color.g,
                color.b
            );
        }
        self.current = dimmed;
    }
}

/// Reports the busy LED through the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusLed;

impl StatusLed for LogStatusLed {
    fn set(&mut self, on: bool) {
        log::trace!("busy led {}", if on { "on" } else { "off" });
    }
}

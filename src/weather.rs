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

//! Current weather conditions.
//!
//! A [`WeatherSource`] is polled by the weather refresh task. Sources return an error for ordinary
//! failures such as a missing or half-written observation file. The refresh task logs the error
//! and keeps the conditions it already had.
//!
//! Fetching observations over the network is left to an external program. [`FileWeatherSource`]
//! reads whatever observation document that program last wrote, in either the OpenWeatherMap
//! "current weather" layout or the weather.gov "latest observation" layout. [`OfflineWeather`]
//! makes conditions up for running without any network at all.

use rand::Rng;
use serde::Deserialize;
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// A specialized [`Result`] type for weather errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when conditions cannot be read.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading observation {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("decoding observation: {0}")]
    Json(#[from] serde_json::Error),
    #[error("observation has no {0}")]
    MissingField(&'static str),
}

/// One observation of the outdoor conditions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSnapshot {
    /// Sustained wind speed in miles per hour.
    pub wind_speed: f32,
    /// Gust speed in miles per hour, zero when no gusts were reported.
    pub wind_gust: f32,
    /// Direction the wind blows from, in degrees clockwise from north.
    pub wind_direction: f32,
    /// Temperature in degrees Fahrenheit.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    pub description: String,
}

/// The layout of an observation document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Format {
    #[serde(rename = "openweathermap")]
    OpenWeatherMap,
    #[serde(rename = "weather_gov")]
    WeatherGov,
}

impl WeatherSnapshot {
    /// Decode an observation document.
    ///
    /// Wind speeds and direction are rounded to whole numbers, temperature and humidity to one
    /// decimal place.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not valid JSON or is missing the wind speed.
    pub fn from_json(format: Format, json: &str) -> Result<WeatherSnapshot> {
        let snapshot: WeatherSnapshot = match format {
            Format::OpenWeatherMap => serde_json::from_str::<owm::Current>(json)?.into(),
            Format::WeatherGov => serde_json::from_str::<nws::Observation>(json)?.into_snapshot()?,
        };
        Ok(snapshot.rounded())
    }

    fn rounded(self) -> WeatherSnapshot {
        let tenths = |x: f32| (x * 10.0).round() / 10.0;
        WeatherSnapshot {
            wind_speed: self.wind_speed.round(),
            wind_gust: self.wind_gust.round(),
            wind_direction: self.wind_direction.round().rem_euclid(360.0),
            temperature: tenths(self.temperature),
            humidity: tenths(self.humidity),
            description: self.description,
        }
    }

    pub fn compass(&self) -> Compass {
        Compass::from_degrees(self.wind_direction)
    }
}

mod owm {
    use super::WeatherSnapshot;
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub struct Current {
        main: Main,
        wind: Wind,
        #[serde(default)]
        weather: Vec<Condition>,
    }

    #[derive(Deserialize)]
    struct Main {
        temp: f32,
        humidity: f32,
    }

    #[derive(Deserialize)]
    struct Wind {
        speed: f32,
        #[serde(default)]
        gust: Option<f32>,
        #[serde(default)]
        deg: f32,
    }

    #[derive(Deserialize)]
    struct Condition {
        main: String,
        description: String,
    }

    impl From<Current> for WeatherSnapshot {
        fn from(current: Current) -> WeatherSnapshot {
            let description = current
                .weather
                .first()
                .map(|condition| format!("{}: {}", condition.main, condition.description))
                .unwrap_or_default();
            WeatherSnapshot {
                wind_speed: current.wind.speed,
                wind_gust: current.wind.gust.unwrap_or(0.0),
                wind_direction: current.wind.deg,
                temperature: current.main.temp,
                humidity: current.main.humidity,
                description,
            }
        }
    }
}

mod nws {
    use super::{Error, Result, WeatherSnapshot};
    use serde::Deserialize;

    const MPH_PER_KMH: f32 = 0.621_371;
    const MPH_PER_MS: f32 = 2.236_936;

    #[derive(Deserialize)]
    pub struct Observation {
        properties: Properties,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Properties {
        #[serde(default)]
        text_description: Option<String>,
        #[serde(default)]
        temperature: Quantity,
        #[serde(default)]
        wind_direction: Quantity,
        #[serde(default)]
        wind_speed: Quantity,
        #[serde(default)]
        wind_gust: Quantity,
        #[serde(default)]
        relative_humidity: Quantity,
    }

    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct Quantity {
        #[serde(default)]
        value: Option<f32>,
        #[serde(default)]
        unit_code: Option<String>,
    }

    impl Quantity {
        fn unit(&self) -> &str {
            self.unit_code
                .as_deref()
                .map(|code| code.trim_start_matches("wmoUnit:").trim_start_matches("unit:"))
                .unwrap_or("")
        }

        fn mph(&self) -> Option<f32> {
            let value = self.value?;
            Some(match self.unit() {
                "km_h-1" => value * MPH_PER_KMH,
                "m_s-1" => value * MPH_PER_MS,
                _ => value,
            })
        }

        fn fahrenheit(&self) -> Option<f32> {
            let value = self.value?;
            Some(match self.unit() {
                "degC" => value * 9.0 / 5.0 + 32.0,
                _ => value,
            })
        }
    }

    impl Observation {
        pub fn into_snapshot(self) -> Result<WeatherSnapshot> {
            let p = self.properties;
            let wind_speed = p.wind_speed.mph().ok_or(Error::MissingField("wind speed"))?;
            Ok(WeatherSnapshot {
                wind_speed,
                wind_gust: p.wind_gust.mph().unwrap_or(0.0),
                wind_direction: p.wind_direction.value.unwrap_or(0.0),
                temperature: p.temperature.fahrenheit().unwrap_or(0.0),
                humidity: p.relative_humidity.value.unwrap_or(0.0),
                description: p.text_description.unwrap_or_default(),
            })
        }
    }
}

/// An eight point compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Compass {
    const POINTS: [Compass; 8] = [
        Compass::N,
        Compass::NE,
        Compass::E,
        Compass::SE,
        Compass::S,
        Compass::SW,
        Compass::W,
        Compass::NW,
    ];

    /// The nearest compass point to a bearing in degrees.
    pub fn from_degrees(degrees: f32) -> Compass {
        let sector = ((degrees + 22.5).rem_euclid(360.0) / 45.0) as usize;
        Compass::POINTS[sector.min(7)]
    }
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A source of weather observations.
///
/// A blanket implementation is provided for closures implementing
/// `FnMut() -> Result<WeatherSnapshot>`.
pub trait WeatherSource {
    fn fetch_conditions(&mut self) -> Result<WeatherSnapshot>;
}

impl<F> WeatherSource for F
where
    F: FnMut() -> Result<WeatherSnapshot>,
{
    fn fetch_conditions(&mut self) -> Result<WeatherSnapshot> {
        self()
    }
}

/// Reads an observation document from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileWeatherSource {
    path: PathBuf,
    format: Format,
}

impl FileWeatherSource {
    pub fn new(path: impl AsRef<Path>, format: Format) -> FileWeatherSource {
        FileWeatherSource {
            path: path.as_ref().to_owned(),
            format,
        }
    }
}

impl WeatherSource for FileWeatherSource {
    fn fetch_conditions(&mut self) -> Result<WeatherSnapshot> {
        log::debug!("reading observation from {}", self.path.display());
        let json = fs::read_to_string(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        WeatherSnapshot::from_json(self.format, &json)
    }
}

/// Invents plausible light-wind conditions.
#[derive(Debug)]
pub struct OfflineWeather<R> {
    rng: R,
}

impl<R: Rng> OfflineWeather<R> {
    pub fn new(rng: R) -> OfflineWeather<R> {
        OfflineWeather { rng }
    }
}

impl<R: Rng> WeatherSource for OfflineWeather<R> {
    fn fetch_conditions(&mut self) -> Result<WeatherSnapshot> {
        Ok(WeatherSnapshot {
            wind_speed: self.rng.gen_range(1..10) as f32,
            wind_gust: self.rng.gen_range(1..10) as f32,
            wind_direction: self.rng.gen_range(0..359) as f32,
            temperature: 72.0,
            humidity: 50.0,
            description: "(random)".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::io::Write;
    use tempdir::TempDir;

    const OPENWEATHERMAP: &str = r#"{
        "coord": {"lon": -119.28, "lat": 46.21},
        "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}],
        "main": {"temp": 71.64, "feels_like": 70.9, "pressure": 1015, "humidity": 38},
        "wind": {"speed": 12.66, "deg": 247, "gust": 20.4},
        "name": "Richland"
    }"#;

    const WEATHER_GOV: &str = r#"{
        "properties": {
            "textDescription": "Mostly Cloudy",
            "temperature": {"unitCode": "wmoUnit:degC", "value": 20.0},
            "windDirection": {"unitCode": "wmoUnit:degree_(angle)", "value": 230},
            "windSpeed": {"unitCode": "wmoUnit:km_h-1", "value": 24.12},
            "windGust": {"unitCode": "wmoUnit:km_h-1", "value": null},
            "relativeHumidity": {"unitCode": "wmoUnit:percent", "value": 45.123}
        }
    }"#;

    #[test]
    fn decodes_openweathermap() {
        let snapshot = WeatherSnapshot::from_json(Format::OpenWeatherMap, OPENWEATHERMAP).unwrap();
        assert_eq!(
            snapshot,
            WeatherSnapshot {
                wind_speed: 13.0,
                wind_gust: 20.0,
                wind_direction: 247.0,
                temperature: 71.6,
                humidity: 38.0,
                description: "Clouds: scattered clouds".to_owned(),
            }
        );
        assert_eq!(snapshot.compass(), Compass::SW);
    }

    #[test]
    fn openweathermap_without_gusts() {
        let json = r#"{"main": {"temp": 50, "humidity": 80}, "wind": {"speed": 0.4, "deg": 10}}"#;
        let snapshot = WeatherSnapshot::from_json(Format::OpenWeatherMap, json).unwrap();
        assert_eq!(snapshot.wind_gust, 0.0);
        assert_eq!(snapshot.wind_speed, 0.0);
        assert_eq!(snapshot.description, "");
    }

    #[test]
    fn decodes_weather_gov() {
        let snapshot = WeatherSnapshot::from_json(Format::WeatherGov, WEATHER_GOV).unwrap();
        assert_eq!(
            snapshot,
            WeatherSnapshot {
                wind_speed: 15.0,
                wind_gust: 0.0,
                wind_direction: 230.0,
                temperature: 68.0,
                humidity: 45.1,
                description: "Mostly Cloudy".to_owned(),
            }
        );
    }

    #[test]
    fn weather_gov_without_wind_is_an_error() {
        let json = r#"{"properties": {"windSpeed": {"value": null}}}"#;
        let err = WeatherSnapshot::from_json(Format::WeatherGov, json).unwrap_err();
        assert!(matches!(err, Error::MissingField("wind speed")));
    }

    #[test]
    fn garbage_is_an_error() {
        let err = WeatherSnapshot::from_json(Format::OpenWeatherMap, "{\"main\":").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn compass_points() {
        let bearings = vec![0.0, 22.4, 22.5, 90.0, 180.0, 240.0, 250.0, 337.4, 337.5, 359.0];
        let names: Vec<String> = bearings
            .into_iter()
            .map(|degrees| Compass::from_degrees(degrees).to_string())
            .collect();
        assert_eq!(names, vec!["N", "N", "NE", "E", "S", "SW", "W", "NW", "N", "N"]);
    }

    #[test]
    fn file_source_rereads_on_every_fetch() {
        let dir = TempDir::new("windchime-weather").unwrap();
        let path = dir.path().join("observation.json");
        let mut source = FileWeatherSource::new(&path, Format::OpenWeatherMap);

        assert!(matches!(source.fetch_conditions(), Err(Error::Io { .. })));

        fs::File::create(&path)
            .unwrap()
            .write_all(OPENWEATHERMAP.as_bytes())
            .unwrap();
        assert_eq!(source.fetch_conditions().unwrap().wind_speed, 13.0);
    }

    #[test]
    fn offline_weather_is_light_wind() {
        let mut source = OfflineWeather::new(StdRng::seed_from_u64(9));
        for _ in 0..100 {
            let snapshot = source.fetch_conditions().unwrap();
            assert!(snapshot.wind_speed >= 1.0 && snapshot.wind_speed < 10.0);
            assert!(snapshot.wind_gust >= 1.0 && snapshot.wind_gust < 10.0);
            assert!(snapshot.wind_direction >= 0.0 && snapshot.wind_direction < 359.0);
            assert_eq!(snapshot.description, "(random)");
        }
    }
}

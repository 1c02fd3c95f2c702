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

//! The chime device: its shared state and the bodies of its four recurring tasks.
//!
//! [`DeviceState`] is the scheduler context. It owns the collaborators the tasks talk to and the
//! [`WindState`], which only [`DeviceState::refresh_weather`] writes and every other task reads.
//! Since tasks never run concurrently, a write is visible to every task that runs after it.

use crate::{
    clock::{local_time_of_day, Clock, Sleeper},
    config::{self, DeviceConfig, TaskSchedule, CLOCK_TITLE, WEATHER_TITLE},
    indicator::{IndicatorLamp, StatusLed, WindColorTable, INITIALIZING, OFF},
    music::{self, amplitude, ChimeScale, Generator},
    scheduler::{self, Scheduler},
    voice::ChimeVoice,
    weather::{Compass, WeatherSnapshot, WeatherSource},
};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;

const HEARTBEAT_FLASH: Duration = Duration::from_millis(100);

/// The most recent wind observation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindState {
    pub speed_mph: f32,
    pub gust_mph: f32,
    /// Degrees in `0.0..360.0`.
    pub direction_deg: f32,
    pub description: String,
}

impl WindState {
    pub fn update(&mut self, snapshot: &WeatherSnapshot) {
        self.speed_mph = snapshot.wind_speed.max(0.0);
        self.gust_mph = snapshot.wind_gust.max(0.0);
        self.direction_deg = snapshot.wind_direction.rem_euclid(360.0);
        self.description = snapshot.description.clone();
    }

    pub fn compass(&self) -> Compass {
        Compass::from_degrees(self.direction_deg)
    }
}

/// The external parts of the device.
pub struct Collaborators {
    pub weather: Box<dyn WeatherSource>,
    pub voice: Box<dyn ChimeVoice>,
    pub lamp: Box<dyn IndicatorLamp>,
    pub busy_led: Box<dyn StatusLed>,
    pub sleeper: Box<dyn Sleeper>,
}

/// Everything the device's tasks share.
pub struct DeviceState {
    wind: WindState,
    scale: ChimeScale,
    colors: WindColorTable,
    generator: Generator<StdRng>,
    tz_offset_hours: i32,
    chime_on_refresh: bool,
    weather: Box<dyn WeatherSource>,
    voice: Box<dyn ChimeVoice>,
    lamp: Box<dyn IndicatorLamp>,
    busy_led: Box<dyn StatusLed>,
    sleeper: Box<dyn Sleeper>,
}

impl std::fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceState")
            .field("wind", &self.wind)
            .field("scale", &self.scale)
            .field("tz_offset_hours", &self.tz_offset_hours)
            .field("chime_on_refresh", &self.chime_on_refresh)
            .finish()
    }
}

impl DeviceState {
    /// Create the device state from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured scale is invalid.
    pub fn new(config: &DeviceConfig, parts: Collaborators) -> config::Result<DeviceState> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(DeviceState {
            wind: WindState::default(),
            scale: config.scale.build()?,
            colors: WindColorTable::default(),
            generator: Generator::new(rng),
            tz_offset_hours: config.tz_offset_hours,
            chime_on_refresh: config.chime_on_refresh,
            weather: parts.weather,
            voice: parts.voice,
            lamp: parts.lamp,
            busy_led: parts.busy_led,
            sleeper: parts.sleeper,
        })
    }

    /// Replace the NOAA colors with a custom table.
    pub fn with_colors(mut self, colors: WindColorTable) -> DeviceState {
        self.colors = colors;
        self
    }

    pub fn wind(&self) -> &WindState {
        &self.wind
    }

    pub fn scale(&self) -> &ChimeScale {
        &self.scale
    }

    /// Power-on sequence, run once before the control loop starts.
    ///
    /// Shows the initializing color, takes a first weather reading without touching the lamp,
    /// sweeps through every tube, then clears the lamp.
    pub fn start_up(&mut self) {
        self.lamp.set_color(INITIALIZING);
        if let Some(snapshot) = self.fetch() {
            self.wind.update(&snapshot);
        }
        music::sweep(&self.scale, &mut *self.voice, &mut *self.sleeper);
        self.lamp.set_color(OFF);
    }

    /// Flash the busy LED.
    pub fn heartbeat(&mut self, _now: u64) {
        self.busy_led.set(true);
        self.sleeper.sleep(HEARTBEAT_FLASH);
        self.busy_led.set(false);
    }

    /// Log the local time of day.
    pub fn display_clock(&mut self, now: u64) {
        let (hour, minute) = local_time_of_day(now, self.tz_offset_hours);
        log::info!("{}: {:02}:{:02}", CLOCK_TITLE, hour, minute);
    }

    /// Play one gesture for the current wind, then wait out the pause before the next one.
    pub fn play_chimes(&mut self, _now: u64) {
        let wind_speed = self.wind.speed_mph;
        let gesture = self.generator.generate_gesture(&self.scale, wind_speed);
        let delay =
            self.generator
                .render(&self.scale, &gesture, &mut *self.voice, &mut *self.sleeper);
        log::debug!(
            "played {} of {:?} at {:.2}, resting {:.2}s",
            gesture.play_count(),
            gesture.indices(),
            gesture.amplitude(),
            delay.as_secs_f32()
        );
        self.sleeper.sleep(delay);
    }

    /// Take a new weather reading and show its wind speed on the lamp.
    ///
    /// A failed reading is logged and the previous wind state and lamp color are kept.
    pub fn refresh_weather(&mut self, now: u64) {
        let (hour, minute) = local_time_of_day(now, self.tz_offset_hours);
        log::info!("{}: {:02}:{:02}", WEATHER_TITLE, hour, minute);

        let snapshot = match self.fetch() {
            Some(snapshot) => snapshot,
            None => return,
        };
        log::info!("  temperature:    {}F", snapshot.temperature);
        log::info!("  humidity:       {}%", snapshot.humidity);
        log::info!("  wind speed:     {}mph", snapshot.wind_speed);
        log::info!("  wind direction: {}", snapshot.compass());
        log::info!("  wind gusts:     {}mph", snapshot.wind_gust);
        log::info!("  description:    {}", snapshot.description);

        self.wind.update(&snapshot);
        self.lamp.set_color(self.colors.select(self.wind.speed_mph));

        if self.chime_on_refresh {
            self.voice
                .strike(self.scale.note(0), amplitude(self.wind.speed_mph));
        }
    }

    fn fetch(&mut self) -> Option<WeatherSnapshot> {
        match self.weather.fetch_conditions() {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!("weather refresh failed, keeping previous conditions: {}", err);
                None
            }
        }
    }
}

/// Create a scheduler running the device's four tasks.
///
/// Within a tick the tasks run in the order heartbeat, clock, chimes, weather.
///
/// # Errors
///
/// Returns an error if any task timing is invalid.
pub fn build_scheduler<K: Clock>(
    tasks: &TaskSchedule,
    clock: K,
) -> scheduler::Result<Scheduler<DeviceState, K>> {
    let descriptors = tasks.descriptors()?;
    let mut scheduler = Scheduler::new(clock);
    scheduler.register(descriptors.heartbeat, DeviceState::heartbeat);
    scheduler.register(descriptors.clock, DeviceState::display_clock);
    scheduler.register(descriptors.chimes, DeviceState::play_chimes);
    scheduler.register(descriptors.weather, DeviceState::refresh_weather);
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{indicator::hex, music::Note, weather};
    use pretty_assertions::assert_eq;
    use smart_leds::RGB8;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Default)]
    struct Recording {
        strikes: Vec<(u8, f32)>,
        colors: Vec<RGB8>,
        leds: Vec<bool>,
        slept: Vec<Duration>,
    }

    fn device(
        config: &DeviceConfig,
        readings: Vec<weather::Result<WeatherSnapshot>>,
    ) -> (DeviceState, Rc<RefCell<Recording>>) {
        let recording = Rc::new(RefCell::new(Recording::default()));
        let mut readings = readings.into_iter();
        let parts = Collaborators {
            weather: Box::new(move || -> weather::Result<WeatherSnapshot> {
                readings
                    .next()
                    .unwrap_or_else(|| Err(weather::Error::MissingField("reading")))
            }),
            voice: Box::new({
                let recording = recording.clone();
                move |note: Note, amplitude: f32| {
                    recording.borrow_mut().strikes.push((note.midi(), amplitude))
                }
            }),
            lamp: Box::new({
                let recording = recording.clone();
                move |color: RGB8| recording.borrow_mut().colors.push(color)
            }),
            busy_led: Box::new({
                let recording = recording.clone();
                move |on: bool| recording.borrow_mut().leds.push(on)
            }),
            sleeper: Box::new({
                let recording = recording.clone();
                move |duration: Duration| recording.borrow_mut().slept.push(duration)
            }),
        };
        (DeviceState::new(config, parts).unwrap(), recording)
    }

    fn snapshot(wind_speed: f32) -> WeatherSnapshot {
        WeatherSnapshot {
            wind_speed,
            wind_gust: wind_speed + 5.0,
            wind_direction: 225.0,
            temperature: 70.0,
            humidity: 40.0,
            description: "Clear: clear sky".to_owned(),
        }
    }

    fn chime_config() -> DeviceConfig {
        DeviceConfig {
            scale: config::ScaleConfig::Notes {
                notes: vec![60, 62, 64, 65, 67, 69, 71, 72],
            },
            seed: Some(11),
            ..DeviceConfig::default()
        }
    }

    #[test]
    fn refresh_updates_wind_and_lamp() {
        let (mut state, recording) = device(&chime_config(), vec![Ok(snapshot(3.0))]);
        state.refresh_weather(0);

        assert_eq!(state.wind().speed_mph, 3.0);
        assert_eq!(state.wind().gust_mph, 8.0);
        assert_eq!(state.wind().compass(), Compass::SW);
        let recording = recording.borrow();
        assert_eq!(recording.colors, vec![hex(0x3365FF)]);
        assert_eq!(recording.strikes.len(), 1);
        assert_eq!(recording.strikes[0].0, 60);
        assert!((recording.strikes[0].1 - amplitude(3.0)).abs() < 1e-6);
    }

    #[test]
    fn failed_refresh_keeps_previous_state() {
        let (mut state, recording) = device(
            &chime_config(),
            vec![
                Ok(snapshot(20.0)),
                Err(weather::Error::MissingField("wind speed")),
            ],
        );
        state.refresh_weather(0);
        let before = state.wind().clone();
        state.refresh_weather(1200);

        assert_eq!(state.wind(), &before);
        let recording = recording.borrow();
        assert_eq!(recording.colors, vec![hex(0x00CC00)]);
        assert_eq!(recording.strikes.len(), 1);
    }

    #[test]
    fn refresh_chime_can_be_disabled() {
        let config = DeviceConfig {
            chime_on_refresh: false,
            ..chime_config()
        };
        let (mut state, recording) = device(&config, vec![Ok(snapshot(3.0))]);
        state.refresh_weather(0);
        assert!(recording.borrow().strikes.is_empty());
    }

    #[test]
    fn calm_chimes_rest_for_thirty_seconds() {
        let (mut state, recording) = device(&chime_config(), vec![Ok(snapshot(0.0))]);
        state.refresh_weather(0);
        recording.borrow_mut().strikes.clear();

        state.play_chimes(3);

        let recording = recording.borrow();
        assert_eq!(recording.slept.last(), Some(&Duration::from_secs(30)));
        // One pause per strike plus the rest.
        assert_eq!(recording.slept.len(), recording.strikes.len() + 1);
        assert!(recording.strikes.len() <= 4);
        assert!(recording
            .strikes
            .iter()
            .all(|(_, amplitude)| (*amplitude - 0.4).abs() < 1e-6));
    }

    #[test]
    fn heartbeat_flashes_busy_led() {
        let (mut state, recording) = device(&chime_config(), Vec::new());
        state.heartbeat(0);
        let recording = recording.borrow();
        assert_eq!(recording.leds, vec![true, false]);
        assert_eq!(recording.slept, vec![Duration::from_millis(100)]);
    }

    #[test]
    fn start_up_sweeps_and_reads_weather() {
        let (mut state, recording) = device(&chime_config(), vec![Ok(snapshot(30.0))]);
        state.start_up();

        assert_eq!(state.wind().speed_mph, 30.0);
        let recording = recording.borrow();
        assert_eq!(recording.colors, vec![INITIALIZING, OFF]);
        assert_eq!(
            recording.strikes.iter().map(|(midi, _)| *midi).collect::<Vec<_>>(),
            vec![60, 62, 64, 65, 67, 69, 71, 72]
        );
        assert!(recording.strikes.iter().all(|(_, amplitude)| *amplitude == 1.0));
    }

    #[test]
    fn start_up_survives_missing_weather() {
        let (mut state, recording) = device(&chime_config(), Vec::new());
        state.start_up();
        assert_eq!(state.wind(), &WindState::default());
        assert_eq!(recording.borrow().strikes.len(), 8);
    }

    #[test]
    fn negative_and_wrapped_readings_are_normalized() {
        let mut wind = WindState::default();
        wind.update(&WeatherSnapshot {
            wind_speed: -2.0,
            wind_direction: 370.0,
            ..WeatherSnapshot::default()
        });
        assert_eq!(wind.speed_mph, 0.0);
        assert_eq!(wind.direction_deg, 10.0);
    }

    #[test]
    fn scheduler_runs_tasks_in_order() {
        let (mut state, recording) = device(&chime_config(), vec![Ok(snapshot(10.0))]);
        let mut scheduler = build_scheduler(&TaskSchedule::default(), || 720u64).unwrap();
        let titles: Vec<&str> = scheduler.tasks().map(|(d, _)| d.title()).collect();
        assert_eq!(
            titles,
            vec![
                "heartbeat",
                "display clock",
                "play wind-related chimes",
                "update clock and weather"
            ]
        );

        assert_eq!(scheduler.tick(&mut state), 4);
        // The weather task runs last, so the chimes played with the old, calm wind.
        assert!(recording.borrow().slept[1..].contains(&Duration::from_secs(30)));
        assert_eq!(state.wind().speed_mph, 10.0);
    }
}

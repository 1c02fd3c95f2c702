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

//! A wind chime that plays the weather, driven by a
//! [SuperCollider](https://supercollider.github.io/) server.
//!
//! # Introduction
//!
//! Windchime reads the current wind conditions and turns them into short musical gestures on a
//! set of virtual chime tubes. Calm air produces quiet, sparse gestures. Strong wind produces
//! loud, dense ones. A single RGB lamp shows the wind speed using the NOAA wind speed colors.
//!
//! Everything runs on one thread. A cooperative [`Scheduler`](scheduler::Scheduler) polls four
//! recurring tasks and runs each one at most once per time window:
//!
//!  * **heartbeat** - flashes the busy LED every 2 seconds.
//!
//!  * **display clock** - logs the local time once a minute.
//!
//!  * **play wind-related chimes** - plays one gesture for the current wind, then rests.
//!
//!  * **update clock and weather** - refreshes the wind conditions every 20 minutes.
//!
//! The crate is split into:
//!
//!  * [`scheduler`](crate::scheduler) - Task descriptors and the cooperative scheduler.
//!
//!  * [`music`](crate::music) - Notes, chime scales, and the gesture generator.
//!
//!  * [`voice`](crate::voice) - Striking notes on a SuperCollider server over OSC.
//!
//!  * [`weather`](crate::weather) - Weather snapshots and where they come from.
//!
//!  * [`indicator`](crate::indicator) - The wind color lamp and the busy LED.
//!
//!  * [`clock`](crate::clock) - Wall clock time and sleeping.
//!
//!  * [`config`](crate::config) - JSON device configuration.
//!
//!  * [`device`](crate::device) - The shared device state and the task bodies.
//!
//! # Examples
//!
//! This example runs the chime against a local SuperCollider server using randomly generated
//! weather. The server must already have a synth definition named `chime` loaded; see the
//! [`voice`](crate::voice) module for one.
//!
//! ```no_run
//! # use anyhow::Result;
//! use rand::{rngs::StdRng, SeedableRng};
//! use windchime::{
//!     clock::{SystemClock, ThreadSleeper},
//!     config::DeviceConfig,
//!     device::{self, Collaborators, DeviceState},
//!     indicator::{LogIndicator, LogStatusLed},
//!     voice::OscChimeVoice,
//!     weather::OfflineWeather,
//! };
//!
//! fn main() -> Result<()> {
//!     let config = DeviceConfig::default();
//!
//!     // Connect to a SuperCollider server started outside of this program.
//!     let voice = OscChimeVoice::connect(&config.synth.address, &config.synth.synthdef)?
//!         .loudness(config.loudness);
//!
//!     let mut state = DeviceState::new(
//!         &config,
//!         Collaborators {
//!             weather: Box::new(OfflineWeather::new(StdRng::from_entropy())),
//!             voice: Box::new(voice),
//!             lamp: Box::new(LogIndicator::new(config.led_brightness)),
//!             busy_led: Box::new(LogStatusLed),
//!             sleeper: Box::new(ThreadSleeper),
//!         },
//!     )?;
//!
//!     // Sweep through every tube, then hand control to the scheduler for good.
//!     state.start_up();
//!     device::build_scheduler(&config.tasks, SystemClock)?.run_forever(&mut state)
//! }
//! ```

pub mod clock;
pub mod config;
pub mod device;
pub mod indicator;
pub mod music;
pub mod scheduler;
pub mod voice;
pub mod weather;

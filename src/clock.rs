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

//! Time capabilities used by the scheduler and the task bodies.
//!
//! Nothing in this crate reads the system clock or sleeps the thread directly. Instead, a
//! [`Clock`] and a [`Sleeper`] are handed to the code that needs them, so tests can replace wall
//! clock time with a scripted sequence of timestamps and replace sleeping with a recording no-op.
//!
//! As a convenience, both traits are implemented for closures:
//!
//! ```
//! use windchime::clock::{Clock, Sleeper};
//! use std::time::Duration;
//!
//! let mut ticks = vec![10u64, 11, 12].into_iter();
//! let mut clock = move || ticks.next().unwrap_or(0);
//! assert_eq!(clock.now(), 10);
//!
//! let mut slept = Duration::default();
//! let mut sleeper = |duration: Duration| slept += duration;
//! sleeper.sleep(Duration::from_millis(250));
//! ```

use std::{
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A source of wall clock time with one second resolution.
///
/// Monotonicity is not required. The scheduler compares `now() % cycle` against a task's offset,
/// so the clock is expected to have wall clock semantics.
pub trait Clock {
    /// Returns the current time in whole seconds since the Unix epoch.
    fn now(&mut self) -> u64;
}

impl<F> Clock for F
where
    F: FnMut() -> u64,
{
    fn now(&mut self) -> u64 {
        self()
    }
}

/// Reads the operating system's real time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> u64 {
        // A clock set before 1970 is treated as the epoch itself.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}

/// Blocks the calling task for a duration.
///
/// The scheduler is cooperative and single threaded, so a sleep inside a task body holds up every
/// other task until it returns.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

impl<F> Sleeper for F
where
    F: FnMut(Duration),
{
    fn sleep(&mut self, duration: Duration) {
        self(duration)
    }
}

/// Sleeps using [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Converts epoch seconds into a local `(hour, minute)` pair.
///
/// `tz_offset_hours` is the fixed offset from UTC, e.g. `-7` for Pacific daylight time.
pub fn local_time_of_day(epoch_seconds: u64, tz_offset_hours: i32) -> (u32, u32) {
    const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

    let local = epoch_seconds as i64 + i64::from(tz_offset_hours) * 60 * 60;
    let seconds_of_day = local.rem_euclid(SECONDS_PER_DAY);
    let hour = seconds_of_day / 3600;
    let minute = (seconds_of_day % 3600) / 60;
    (hour as u32, minute as u32)
}

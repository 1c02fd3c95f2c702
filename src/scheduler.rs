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

//! A cooperative scheduler for executing recurring tasks from a single control loop.
//!
//! A [`Scheduler`] owns a fixed set of tasks, each described by a [`TaskDescriptor`] and bound to a
//! body implementing [`Task`]. On every [`tick`](Scheduler::tick) the scheduler reads its
//! [`Clock`] exactly once and decides, independently for every task, whether the task is due:
//!
//! ```text
//! due = now % cycle_seconds == offset_seconds || state == FirstRun
//! ```
//!
//! A due task runs at most once per congruence window. Its [`TaskState`] acts as an edge
//! triggered latch: the body runs on the first due tick, the task is then `Done` until a tick is
//! observed where it is not due, which makes it `Idle` and eligible again.
//!
//! # Examples
//!
//! ```
//! use windchime::scheduler::{Scheduler, TaskDescriptor};
//!
//! let mut times = vec![0u64, 0, 1, 2, 2, 3, 4].into_iter();
//! let mut scheduler = Scheduler::new(move || times.next().unwrap_or(0));
//!
//! let descriptor = TaskDescriptor::new("even seconds", 2, 0)?;
//! scheduler.register(descriptor, |fired: &mut Vec<u64>, now: u64| fired.push(now));
//!
//! let mut fired = Vec::new();
//! for _ in 0..7 {
//!     scheduler.tick(&mut fired);
//! }
//! assert_eq!(fired, vec![0, 2, 4]);
//! # windchime::scheduler::Result::Ok(())
//! ```
//!
//! # Blocking
//!
//! There are no threads and no preemption. Task bodies run synchronously to completion, and a
//! body that sleeps or waits on I/O holds up every other task for that long. Pacing comes entirely
//! from the task bodies; the loop itself never sleeps.
//!
//! The scheduler does not isolate tasks from each other's failures. Bodies must handle their own
//! recoverable errors, typically by logging them and keeping stale state, so that one failing task
//! cannot stop the loop.

use crate::clock::Clock;
use thiserror::Error;

mod scheduler_impl;

use scheduler_impl::Slot;

/// A specialized [`Result`] type for scheduler errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when a task is described incorrectly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("task {title:?} has a cycle of zero seconds")]
    ZeroCycle { title: String },
    #[error("task {title:?} has offset {offset_seconds}s which is not less than its {cycle_seconds}s cycle")]
    OffsetOutOfRange {
        title: String,
        cycle_seconds: u64,
        offset_seconds: u64,
    },
}

/// The timing of a recurring task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskDescriptor {
    title: String,
    cycle_seconds: u64,
    offset_seconds: u64,
}

impl TaskDescriptor {
    /// Describe a task that is due whenever `now % cycle_seconds == offset_seconds`.
    ///
    /// # Errors
    ///
    /// Returns an error if `cycle_seconds` is zero, or if `offset_seconds` is not less than
    /// `cycle_seconds`, since such a task could never be due after its first run.
    pub fn new(
        title: impl Into<String>,
        cycle_seconds: u64,
        offset_seconds: u64,
    ) -> Result<TaskDescriptor> {
        let title = title.into();
        if cycle_seconds == 0 {
            return Err(Error::ZeroCycle { title });
        }
        if offset_seconds >= cycle_seconds {
            return Err(Error::OffsetOutOfRange {
                title,
                cycle_seconds,
                offset_seconds,
            });
        }
        Ok(TaskDescriptor {
            title,
            cycle_seconds,
            offset_seconds,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cycle_seconds(&self) -> u64 {
        self.cycle_seconds
    }

    pub fn offset_seconds(&self) -> u64 {
        self.offset_seconds
    }

    /// Returns true if the task's congruence holds at `now`.
    pub fn is_congruent(&self, now: u64) -> bool {
        now % self.cycle_seconds == self.offset_seconds
    }
}

/// The run latch of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The task has never been evaluated and will run on the next tick.
    FirstRun,
    /// The task was not due on the latest tick and will run when it next becomes due.
    Idle,
    /// The task has run during the current window.
    Done,
}

/// The body of a recurring task.
///
/// `context` is the state shared between all tasks of a scheduler and `now` is the timestamp read
/// at the start of the tick, which every task in that tick observes.
///
/// A blanket implementation is provided for closures implementing `FnMut(&mut C, u64)`.
pub trait Task<C> {
    fn run(&mut self, context: &mut C, now: u64);
}

impl<C, F> Task<C> for F
where
    F: FnMut(&mut C, u64),
{
    fn run(&mut self, context: &mut C, now: u64) {
        self(context, now)
    }
}

/// A cooperative scheduler for a fixed set of recurring tasks.
///
/// `C` is the context type handed to every task body and `K` is the clock.
pub struct Scheduler<C, K> {
    clock: K,
    slots: Vec<Slot<C>>,
}

impl<C, K> std::fmt::Debug for Scheduler<C, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.slots)
            .finish()
    }
}

impl<C, K: Clock> Scheduler<C, K> {
    /// Create a scheduler with no tasks that reads time from `clock`.
    pub fn new(clock: K) -> Scheduler<C, K> {
        Scheduler {
            clock,
            slots: Vec::new(),
        }
    }

    /// Bind a task body to a descriptor.
    ///
    /// Tasks are evaluated in registration order on every tick. All tasks must be registered
    /// before [`run_forever`](Scheduler::run_forever) is called, which consumes the scheduler.
    pub fn register(&mut self, descriptor: TaskDescriptor, body: impl Task<C> + 'static) {
        log::debug!(
            "registered task {:?}: every {}s at +{}s",
            descriptor.title(),
            descriptor.cycle_seconds(),
            descriptor.offset_seconds()
        );
        self.slots.push(Slot::new(descriptor, Box::new(body)));
    }

    /// Returns each registered task with its current latch state, in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = (&TaskDescriptor, TaskState)> {
        self.slots.iter().map(|slot| (slot.descriptor(), slot.state()))
    }

    /// Evaluate every task once against a single reading of the clock.
    ///
    /// Returns the number of task bodies that ran.
    pub fn tick(&mut self, context: &mut C) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        for slot in &mut self.slots {
            if slot.poll(context, now) {
                fired += 1;
            }
        }
        fired
    }

    /// Tick continuously.
    ///
    /// There is no delay between ticks. The loop is paced by the sleeps inside the task bodies.
    pub fn run_forever(mut self, context: &mut C) -> ! {
        log::info!("starting control loop with {} tasks", self.slots.len());
        loop {
            self.tick(context);
        }
    }
}

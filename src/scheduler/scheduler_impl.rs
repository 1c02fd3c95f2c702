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

use crate::scheduler::{Task, TaskDescriptor, TaskState};
use std::fmt;

/// What a task should do on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run,
    Skip,
}

/// The latch transition table.
///
/// | due   | state            | action | next state |
/// |-------|------------------|--------|------------|
/// | true  | FirstRun / Idle  | Run    | Done       |
/// | true  | Done             | Skip   | Done       |
/// | false | any              | Skip   | Idle       |
///
/// `due` already includes the `FirstRun` override.
pub fn transition(state: TaskState, due: bool) -> (Action, TaskState) {
    match (due, state) {
        (true, TaskState::FirstRun) | (true, TaskState::Idle) => (Action::Run, TaskState::Done),
        (true, TaskState::Done) => (Action::Skip, TaskState::Done),
        (false, _) => (Action::Skip, TaskState::Idle),
    }
}

pub struct Slot<C> {
    descriptor: TaskDescriptor,
    state: TaskState,
    body: Box<dyn Task<C>>,
}

impl<C> fmt::Debug for Slot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .finish()
    }
}

impl<C> Slot<C> {
    pub fn new(descriptor: TaskDescriptor, body: Box<dyn Task<C>>) -> Slot<C> {
        Slot {
            descriptor,
            state: TaskState::FirstRun,
            body,
        }
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Evaluates the task at `now`, running its body if it is due and has not yet run in this
    /// window. Returns true if the body ran.
    pub fn poll(&mut self, context: &mut C, now: u64) -> bool {
        let due = self.descriptor.is_congruent(now) || self.state == TaskState::FirstRun;
        let (action, next) = transition(self.state, due);
        let ran = match action {
            Action::Run => {
                log::debug!("running task {:?} at {}", self.descriptor.title(), now);
                self.body.run(context, now);
                true
            }
            Action::Skip => false,
        };
        self.state = next;
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use Action::*;
        use TaskState::*;

        assert_eq!(transition(FirstRun, true), (Run, Done));
        assert_eq!(transition(Idle, true), (Run, Done));
        assert_eq!(transition(Done, true), (Skip, Done));
        assert_eq!(transition(FirstRun, false), (Skip, Idle));
        assert_eq!(transition(Idle, false), (Skip, Idle));
        assert_eq!(transition(Done, false), (Skip, Idle));
    }

    #[test]
    fn first_run_overrides_congruence() {
        let mut slot: Slot<u32> = Slot::new(
            TaskDescriptor::new("counter", 60, 30).unwrap(),
            Box::new(|count: &mut u32, _: u64| *count += 1),
        );
        let mut count = 0;
        assert!(slot.poll(&mut count, 7));
        assert!(!slot.poll(&mut count, 8));
        assert!(slot.poll(&mut count, 90));
        assert_eq!(count, 2);
    }
}

// TDB - Trace Debugger
// Copyright (C) 2025 TDB contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Injectable timer capability for continuous playback.
//!
//! The playback engine never owns a real timer. It asks its scheduler to arm
//! a repeating timer and remembers the returned [`TimerId`]; the host delivers
//! ticks back via `PlaybackEngine::on_tick`. Ticks carrying a stale id (armed
//! before the latest cancel) are ignored, so a tick racing a `pause()` on the
//! host's event loop resolves to whichever lands first.

use std::{fmt, time::Duration};

/// Handle identifying one armed repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Create a timer id from its raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Capability to arm and cancel one repeating timer.
///
/// Implementations must hand out a fresh [`TimerId`] per `schedule_repeating`
/// call; the engine guarantees it cancels any previous timer before arming a
/// new one, so at most one timer per engine instance is live at a time.
pub trait Scheduler {
    /// Arm a repeating timer firing every `period`.
    fn schedule_repeating(&mut self, period: Duration) -> TimerId;

    /// Cancel a previously armed timer. Cancelling an already-cancelled or
    /// unknown id is a no-op.
    fn cancel(&mut self, id: TimerId);
}

/// Deterministic scheduler for tests and synchronous hosts.
///
/// Records armed timers; the caller fires ticks by reading [`Self::active`]
/// and invoking the engine directly.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    active: Option<(TimerId, Duration)>,
    scheduled: usize,
    cancelled: usize,
}

impl ManualScheduler {
    /// Create a new manual scheduler with no armed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently armed timer, if any.
    pub fn active(&self) -> Option<(TimerId, Duration)> {
        self.active
    }

    /// Number of `schedule_repeating` calls observed.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled
    }

    /// Number of effective cancels observed.
    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.active = Some((id, period));
        self.scheduled += 1;
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if self.active.map(|(active, _)| active) == Some(id) {
            self.active = None;
            self.cancelled += 1;
        }
    }
}

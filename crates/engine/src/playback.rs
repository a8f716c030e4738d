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

//! The playback state machine.
//!
//! [`PlaybackEngine`] owns the current step index, run mode, speed,
//! breakpoints, and watch list, and exposes the full command set: start,
//! pause, resume, the step family, jump, breakpoint/watch mutations, speed
//! change, and reset. Every index change recomputes derived state, appends to
//! the execution history (deduplicated by node), diffs variable bindings, and
//! records a memory snapshot.
//!
//! All operations are synchronous and atomic: they either succeed with the
//! engine state updated, or fail with a named error leaving it unchanged.
//! Continuous mode is driven by ticks the host delivers via
//! [`PlaybackEngine::on_tick`]; see [`crate::scheduler`].

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::debug;

use tdb_common::types::{
    Breakpoint, DerivedState, ExecutionMode, MemoryObject, NodeId, SimulationState,
    VariableBinding,
};

use crate::{
    error::EngineError,
    matcher,
    scheduler::{Scheduler, TimerId},
    state::{call_stack_len, compute_state_with_depth, DEFAULT_MAX_STACK_DEPTH},
    store::TraceStore,
    Result,
};

/// Category of an event-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogKind {
    /// Playback started
    ExecutionStart,
    /// Playback paused
    ExecutionPause,
    /// Playback resumed
    ExecutionResume,
    /// Playback advanced past the last event
    ExecutionComplete,
    /// A breakpoint paused continuous playback
    Breakpoint,
    /// A breakpoint was added
    BreakpointAdd,
    /// A breakpoint was removed
    BreakpointRemove,
    /// A variable joined the watch list
    WatchAdd,
    /// A variable left the watch list
    WatchRemove,
    /// A watched variable changed value
    VariableChange,
    /// A step-into command ran
    StepInto,
    /// A step-over command ran
    StepOver,
    /// A step-out command ran
    StepOut,
    /// A jump command ran
    JumpToStep,
    /// The continuous-mode interval changed
    SpeedChange,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ExecutionStart => "execution-start",
            Self::ExecutionPause => "execution-pause",
            Self::ExecutionResume => "execution-resume",
            Self::ExecutionComplete => "execution-complete",
            Self::Breakpoint => "breakpoint",
            Self::BreakpointAdd => "breakpoint-add",
            Self::BreakpointRemove => "breakpoint-remove",
            Self::WatchAdd => "watch-add",
            Self::WatchRemove => "watch-remove",
            Self::VariableChange => "variable-change",
            Self::StepInto => "step-into",
            Self::StepOver => "step-over",
            Self::StepOut => "step-out",
            Self::JumpToStep => "jump-to-step",
            Self::SpeedChange => "speed-change",
        };
        write!(f, "{s}")
    }
}

/// One entry in the engine's event log.
///
/// Entries carry the step index at which they were emitted rather than wall
/// time, keeping the engine deterministic; timestamping is a host concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Category of the entry
    pub kind: LogKind,
    /// Step index when the entry was emitted
    pub step: usize,
    /// Human-readable message
    pub message: String,
}

/// One visited position in the execution history.
///
/// Consecutive steps mapping to the same node are collapsed into one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Step index of the visit
    pub step: usize,
    /// Node active at that step
    pub node_id: NodeId,
    /// Bindings in scope at that step, used for change detection
    pub bindings: BTreeMap<String, VariableBinding>,
}

/// A detected change of one variable between consecutive history entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableChange {
    /// Variable name
    pub name: String,
    /// Value before the change
    pub old_value: String,
    /// Value after the change
    pub new_value: String,
    /// Type label of the variable
    pub ty: String,
    /// Node at which the change was observed
    pub node_id: NodeId,
    /// Step index at which the change was observed
    pub step: usize,
}

/// Memory snapshot recorded at one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Step index of the snapshot
    pub step: usize,
    /// Node active at that step
    pub node_id: NodeId,
    /// Objects allocated up to that step, in ledger order
    pub objects: Vec<MemoryObject>,
}

/// Read-only view of the engine for a presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot<'a> {
    /// Current state of the session
    pub simulation_state: SimulationState,
    /// Current step index
    pub current_step_index: usize,
    /// Derived state at the current step, if any has been computed
    pub derived_state: Option<&'a DerivedState>,
    /// Registered breakpoints, in registration order
    pub breakpoints: &'a [Breakpoint],
    /// Watched variable names
    pub watched_variables: Vec<&'a str>,
    /// The event log, oldest first
    pub event_log: &'a [LogEntry],
    /// Progress through the trace in percent; 0 when the trace has <= 1 step
    pub progress_percentage: f64,
}

/// Time-travel playback over one loaded trace.
///
/// Owns the mutable per-session state; the [`TraceStore`] it plays is
/// immutable. The scheduler is injected so hosts and tests control time.
#[derive(Debug)]
pub struct PlaybackEngine<S: Scheduler> {
    store: TraceStore,
    scheduler: S,
    max_stack_depth: usize,

    state: SimulationState,
    mode: ExecutionMode,
    speed: Duration,
    step: usize,
    timer: Option<TimerId>,
    current: Option<DerivedState>,

    breakpoints: Vec<Breakpoint>,
    watched: Vec<String>,

    event_log: Vec<LogEntry>,
    history: Vec<HistoryEntry>,
    variable_changes: Vec<VariableChange>,
    memory_snapshots: Vec<MemorySnapshot>,
}

impl<S: Scheduler> PlaybackEngine<S> {
    /// Create an idle engine over the given trace.
    pub fn new(store: TraceStore, scheduler: S) -> Self {
        Self::with_max_stack_depth(store, scheduler, DEFAULT_MAX_STACK_DEPTH)
    }

    /// Create an idle engine with a custom call-stack depth bound.
    pub fn with_max_stack_depth(store: TraceStore, scheduler: S, max_stack_depth: usize) -> Self {
        Self {
            store,
            scheduler,
            max_stack_depth,
            state: SimulationState::Idle,
            mode: ExecutionMode::StepByStep,
            speed: Duration::from_millis(1000),
            step: 0,
            timer: None,
            current: None,
            breakpoints: Vec::new(),
            watched: Vec::new(),
            event_log: Vec::new(),
            history: Vec::new(),
            variable_changes: Vec::new(),
            memory_snapshots: Vec::new(),
        }
    }
}

// Read-only accessors
impl<S: Scheduler> PlaybackEngine<S> {
    /// The trace being played.
    pub fn store(&self) -> &TraceStore {
        &self.store
    }

    /// Current session state.
    pub fn simulation_state(&self) -> SimulationState {
        self.state
    }

    /// Current step index.
    pub fn current_step_index(&self) -> usize {
        self.step
    }

    /// Current execution mode.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Interval between auto-advanced steps in continuous mode.
    pub fn execution_speed(&self) -> Duration {
        self.speed
    }

    /// Derived state at the current step; `None` before the first transition.
    pub fn derived_state(&self) -> Option<&DerivedState> {
        self.current.as_ref()
    }

    /// Registered breakpoints, in registration order.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Watched variable names, in registration order.
    pub fn watched_variables(&self) -> &[String] {
        &self.watched
    }

    /// The append-only event log.
    pub fn event_log(&self) -> &[LogEntry] {
        &self.event_log
    }

    /// Visited positions, deduplicated by node.
    pub fn execution_history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Detected variable changes.
    pub fn variable_changes(&self) -> &[VariableChange] {
        &self.variable_changes
    }

    /// Memory snapshots recorded on each index change.
    pub fn memory_snapshots(&self) -> &[MemorySnapshot] {
        &self.memory_snapshots
    }

    /// The currently armed timer, if playback is running in continuous mode.
    pub fn armed_timer(&self) -> Option<TimerId> {
        self.timer
    }

    /// Progress through the trace in percent, 0 for traces with <= 1 step.
    pub fn progress_percentage(&self) -> f64 {
        let count = self.store.event_count();
        if count <= 1 {
            0.0
        } else {
            self.step as f64 / (count - 1) as f64 * 100.0
        }
    }

    /// Read-only snapshot for a presentation layer.
    pub fn snapshot(&self) -> EngineSnapshot<'_> {
        EngineSnapshot {
            simulation_state: self.state,
            current_step_index: self.step,
            derived_state: self.current.as_ref(),
            breakpoints: &self.breakpoints,
            watched_variables: self.watched.iter().map(String::as_str).collect(),
            event_log: &self.event_log,
            progress_percentage: self.progress_percentage(),
        }
    }
}

// Playback commands
impl<S: Scheduler> PlaybackEngine<S> {
    /// Start playback in the given mode.
    ///
    /// Valid from `idle` and `completed`; `completed` resets the session
    /// first. In continuous mode a repeating timer is armed at `speed`;
    /// otherwise playback stays driven by explicit step commands.
    pub fn start(&mut self, mode: ExecutionMode, speed: Duration) -> Result<()> {
        match self.state {
            SimulationState::Idle => {}
            SimulationState::Completed => self.reset(),
            state => {
                return Err(EngineError::InvalidTransition { command: "start", state });
            }
        }

        self.mode = mode;
        self.speed = speed;
        self.state = SimulationState::Running;
        self.log(LogKind::ExecutionStart, format!("Execution started in {mode} mode"));
        debug!(%mode, speed_ms = speed.as_millis() as u64, "execution started");

        if self.store.is_empty() {
            self.complete();
            return Ok(());
        }

        // Process the starting step: bookkeeping plus a breakpoint check, so
        // a breakpoint on step 0 pauses before the timer fires.
        self.goto(self.step)?;

        if self.state == SimulationState::Running && self.mode == ExecutionMode::Continuous {
            self.arm_timer();
        }
        Ok(())
    }

    /// Pause running playback, cancelling any armed timer.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != SimulationState::Running {
            return Err(EngineError::InvalidTransition { command: "pause", state: self.state });
        }
        self.cancel_timer();
        self.state = SimulationState::Paused;
        self.log(LogKind::ExecutionPause, "Execution paused".to_string());
        debug!(step = self.step, "execution paused");
        Ok(())
    }

    /// Resume paused playback, re-arming the timer in continuous mode.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != SimulationState::Paused {
            return Err(EngineError::InvalidTransition { command: "resume", state: self.state });
        }
        self.state = SimulationState::Running;
        self.log(LogKind::ExecutionResume, "Execution resumed".to_string());
        debug!(step = self.step, "execution resumed");

        if self.mode == ExecutionMode::Continuous {
            self.arm_timer();
        }
        Ok(())
    }

    /// Deliver one timer tick.
    ///
    /// Ticks whose id does not match the currently armed timer are ignored;
    /// this is what makes a tick racing `pause()` harmless regardless of
    /// delivery order.
    pub fn on_tick(&mut self, id: TimerId) -> Result<()> {
        if self.timer != Some(id) {
            debug!(%id, "ignoring stale timer tick");
            return Ok(());
        }
        if self.step + 1 >= self.store.event_count() {
            self.complete();
            return Ok(());
        }
        self.goto(self.step + 1)
    }

    /// Advance one step, clamped at the end of the trace.
    ///
    /// Advancing past the last event transitions to `completed`. The
    /// transient `stepping` sub-state is entered and exited inside this call.
    pub fn step_next(&mut self) -> Result<()> {
        match self.state {
            SimulationState::Error => {
                return Err(EngineError::InvalidTransition { command: "step", state: self.state })
            }
            SimulationState::Completed => return Ok(()),
            _ => {}
        }
        if self.store.is_empty() {
            self.complete();
            return Ok(());
        }
        if self.step + 1 >= self.store.event_count() {
            self.complete();
            return Ok(());
        }
        self.leave_idle();
        self.goto(self.step + 1)
    }

    /// Step one event backward, clamped at step 0 (no error).
    pub fn step_back(&mut self) -> Result<()> {
        match self.state {
            SimulationState::Error => {
                return Err(EngineError::InvalidTransition { command: "step", state: self.state })
            }
            SimulationState::Completed => return Ok(()),
            _ => {}
        }
        if self.store.is_empty() {
            self.complete();
            return Ok(());
        }
        if self.step == 0 {
            return Ok(());
        }
        self.leave_idle();
        self.goto(self.step - 1)
    }

    /// Step into the next call.
    ///
    /// With a pre-recorded trace there is no depth to expand, so this is
    /// `step_next` plus a log entry.
    pub fn step_into(&mut self) -> Result<()> {
        self.step_next()?;
        self.log(LogKind::StepInto, "Stepping into function".to_string());
        Ok(())
    }

    /// Step over the current call: advance to the next step whose call-stack
    /// depth is less than or equal to the current depth, or to the end of the
    /// trace if no such step exists. One transition; intermediate steps are
    /// only probed for depth.
    pub fn step_over(&mut self) -> Result<()> {
        self.scan_forward(false, LogKind::StepOver, "Stepped over function call")
    }

    /// Step out of the current call: advance to the next step whose
    /// call-stack depth is strictly less than the current depth, or to the
    /// end of the trace.
    pub fn step_out(&mut self) -> Result<()> {
        self.scan_forward(true, LogKind::StepOut, "Stepped out of function")
    }

    /// Jump directly to a step.
    ///
    /// Valid in any state except `error`; pauses first when running. Fails
    /// with [`EngineError::OutOfRange`] for targets outside the trace,
    /// leaving the engine unchanged.
    pub fn jump_to_step(&mut self, target: usize) -> Result<()> {
        if self.state == SimulationState::Error {
            return Err(EngineError::InvalidTransition { command: "jump", state: self.state });
        }
        if target >= self.store.event_count() {
            return Err(EngineError::OutOfRange { step: target, total: self.store.event_count() });
        }
        if self.state == SimulationState::Running {
            self.pause()?;
        }
        self.state = SimulationState::Paused;
        self.goto(target)?;
        self.log(LogKind::JumpToStep, format!("Jumped to step {target}"));
        debug!(step = target, "jumped to step");
        Ok(())
    }

    /// Change the continuous-mode interval.
    ///
    /// If currently running in continuous mode, the timer is re-armed at the
    /// new rate without losing the current index.
    pub fn change_speed(&mut self, speed: Duration) {
        self.speed = speed;

        if self.state == SimulationState::Running
            && self.mode == ExecutionMode::Continuous
            && self.timer.is_some()
        {
            self.cancel_timer();
            self.arm_timer();
        }

        self.log(
            LogKind::SpeedChange,
            format!("Execution speed changed to {}ms", speed.as_millis()),
        );
    }

    /// Reset the session: cancel any timer, return to step 0 and `idle`, and
    /// clear every accumulator. Breakpoints and the watch list survive.
    pub fn reset(&mut self) {
        self.cancel_timer();
        self.step = 0;
        self.state = SimulationState::Idle;
        self.current = None;
        self.event_log.clear();
        self.history.clear();
        self.variable_changes.clear();
        self.memory_snapshots.clear();
        debug!("execution reset");
    }

    /// Add a breakpoint. Duplicate adds are no-ops; returns whether the set
    /// changed, and logs only on actual change.
    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) -> bool {
        if self.breakpoints.contains(&breakpoint) {
            return false;
        }
        self.log(LogKind::BreakpointAdd, format!("Breakpoint added at {breakpoint}"));
        self.breakpoints.push(breakpoint);
        true
    }

    /// Remove a breakpoint. Returns whether the set changed; logs only on
    /// actual change.
    pub fn remove_breakpoint(&mut self, breakpoint: &Breakpoint) -> bool {
        let Some(pos) = self.breakpoints.iter().position(|bp| bp == breakpoint) else {
            return false;
        };
        self.breakpoints.remove(pos);
        self.log(LogKind::BreakpointRemove, format!("Breakpoint removed from {breakpoint}"));
        true
    }

    /// Add a variable to the watch list. Watched variables get a verbose log
    /// entry when their value changes; the watch list never alters derived
    /// state. Returns whether the set changed.
    pub fn add_watched_variable(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.watched.contains(&name) {
            return false;
        }
        self.log(LogKind::WatchAdd, format!("Added \"{name}\" to watch list"));
        self.watched.push(name);
        true
    }

    /// Remove a variable from the watch list. Returns whether the set changed.
    pub fn remove_watched_variable(&mut self, name: &str) -> bool {
        let Some(pos) = self.watched.iter().position(|w| w == name) else {
            return false;
        };
        self.watched.remove(pos);
        self.log(LogKind::WatchRemove, format!("Removed \"{name}\" from watch list"));
        true
    }
}

// Internals
impl<S: Scheduler> PlaybackEngine<S> {
    fn log(&mut self, kind: LogKind, message: String) {
        self.event_log.push(LogEntry { kind, step: self.step, message });
    }

    fn leave_idle(&mut self) {
        if self.state == SimulationState::Idle {
            self.state = SimulationState::Paused;
        }
    }

    fn arm_timer(&mut self) {
        self.cancel_timer();
        let id = self.scheduler.schedule_repeating(self.speed);
        debug!(%id, period_ms = self.speed.as_millis() as u64, "timer armed");
        self.timer = Some(id);
    }

    fn cancel_timer(&mut self) {
        if let Some(id) = self.timer.take() {
            self.scheduler.cancel(id);
            debug!(%id, "timer cancelled");
        }
    }

    fn complete(&mut self) {
        if self.state == SimulationState::Completed {
            return;
        }
        self.cancel_timer();
        self.state = SimulationState::Completed;
        self.log(LogKind::ExecutionComplete, "Execution completed".to_string());
        debug!(step = self.step, "execution completed");
    }

    /// Move the index and run all per-index-change bookkeeping; pauses on a
    /// breakpoint hit when running.
    fn goto(&mut self, target: usize) -> Result<()> {
        let state = match compute_state_with_depth(&self.store, target, self.max_stack_depth) {
            Ok(state) => state,
            Err(e) => {
                // Derived-state computation failing for an in-session index is
                // unrecoverable; surface it and park the engine.
                self.cancel_timer();
                self.state = SimulationState::Error;
                return Err(e);
            }
        };
        self.step = target;

        self.record_history(&state);
        self.memory_snapshots.push(MemorySnapshot {
            step: target,
            node_id: state.current_node.id.clone(),
            objects: state.memory_objects.clone(),
        });

        if self.state == SimulationState::Running {
            if let Some(hit) = matcher::first_match(&self.breakpoints, &state).cloned() {
                self.cancel_timer();
                self.state = SimulationState::Paused;
                self.log(
                    LogKind::Breakpoint,
                    format!(
                        "Execution paused at breakpoint: {}:{}",
                        state.current_node.file_path.display(),
                        state.current_node.line_start
                    ),
                );
                debug!(step = target, breakpoint = %hit, "breakpoint hit");
            }
        }

        self.current = Some(state);
        Ok(())
    }

    /// Append to the history (skipping consecutive same-node entries) and
    /// diff bindings against the previous history entry.
    fn record_history(&mut self, state: &DerivedState) {
        let previous = self.history.last();
        if previous.map(|entry| entry.node_id.as_str()) == Some(state.current_node.id.as_str()) {
            return;
        }

        let mut changes = Vec::new();
        if let Some(prev) = previous {
            for (name, binding) in &state.variable_bindings {
                let Some(old) = prev.bindings.get(name) else { continue };
                if old.value != binding.value {
                    changes.push(VariableChange {
                        name: name.clone(),
                        old_value: old.value.clone(),
                        new_value: binding.value.clone(),
                        ty: binding.ty.clone(),
                        node_id: state.current_node.id.clone(),
                        step: state.step,
                    });
                }
            }
        }
        for change in &changes {
            if self.watched.contains(&change.name) {
                self.log(
                    LogKind::VariableChange,
                    format!(
                        "Variable \"{}\" changed from \"{}\" to \"{}\"",
                        change.name, change.old_value, change.new_value
                    ),
                );
            }
        }
        self.variable_changes.extend(changes);

        self.history.push(HistoryEntry {
            step: state.step,
            node_id: state.current_node.id.clone(),
            bindings: state.variable_bindings.clone(),
        });
    }

    /// Shared forward scan for step-over/step-out.
    fn scan_forward(&mut self, strict: bool, kind: LogKind, message: &str) -> Result<()> {
        match self.state {
            SimulationState::Error => {
                return Err(EngineError::InvalidTransition { command: "step", state: self.state })
            }
            SimulationState::Completed => return Ok(()),
            _ => {}
        }
        if self.store.is_empty() {
            self.complete();
            return Ok(());
        }

        let depth = call_stack_len(&self.store, self.step, self.max_stack_depth)?;
        let count = self.store.event_count();

        // Default target is the end of the trace when no shallower step exists.
        let mut target = count - 1;
        for candidate in self.step + 1..count {
            let candidate_depth = call_stack_len(&self.store, candidate, self.max_stack_depth)?;
            if candidate_depth < depth || (!strict && candidate_depth == depth) {
                target = candidate;
                break;
            }
        }

        self.leave_idle();
        if target == self.step {
            // Already on the last step; nothing to move to.
            return Ok(());
        }
        self.goto(target)?;
        self.log(kind, message.to_string());
        Ok(())
    }
}

impl<S: Scheduler> Drop for PlaybackEngine<S> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

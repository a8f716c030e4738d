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

//! Tokio-backed playback driver.
//!
//! The engine is synchronous and scheduler-agnostic; this module supplies the
//! async half for the CLI. [`TokioScheduler`] turns `schedule_repeating` into
//! a spawned interval task that sends its [`TimerId`] over a channel, and the
//! run loops feed those ticks back into the engine.

use std::time::Duration;

use eyre::Result;
use tdb_common::types::{ExecutionMode, SimulationState, StackFrame};
use tdb_engine::{PlaybackEngine, Scheduler, TimerId};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::debug;

/// Scheduler that arms tokio interval tasks.
///
/// At most one timer is live at a time; arming a new one aborts the previous
/// task. Each task sends its own [`TimerId`] per tick, so the engine's
/// stale-id check filters ticks from an aborted timer that were already in
/// the channel.
#[derive(Debug)]
pub struct TokioScheduler {
    next_id: u64,
    tx: UnboundedSender<TimerId>,
    active: Option<(TimerId, JoinHandle<()>)>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiving end of its tick channel.
    pub fn new() -> (Self, UnboundedReceiver<TimerId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { next_id: 0, tx, active: None }, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        if let Some((stale, handle)) = self.active.take() {
            debug!(%stale, "aborting previous timer task");
            handle.abort();
        }

        let id = TimerId::new(self.next_id);
        self.next_id += 1;

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; skip it so the
            // first delivered tick lands one period after arming.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(id).is_err() {
                    break;
                }
            }
        });

        self.active = Some((id, handle));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some((active, handle)) = self.active.take() {
            if active == id {
                handle.abort();
            } else {
                self.active = Some((active, handle));
            }
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.active.take() {
            handle.abort();
        }
    }
}

/// Play the whole trace in continuous mode, printing each visited step.
///
/// Breakpoint pauses are reported and then resumed, so the run always reaches
/// the end of the trace.
pub async fn run_continuous(
    engine: &mut PlaybackEngine<TokioScheduler>,
    ticks: &mut UnboundedReceiver<TimerId>,
    speed: Duration,
) -> Result<()> {
    engine.start(ExecutionMode::Continuous, speed)?;
    print_current(engine);
    if engine.simulation_state() == SimulationState::Paused {
        // Breakpoint on the starting step.
        report_pause(engine);
        engine.resume()?;
    }

    while engine.simulation_state() == SimulationState::Running {
        let Some(id) = ticks.recv().await else { break };
        let before = engine.current_step_index();
        engine.on_tick(id)?;
        if engine.current_step_index() != before {
            print_current(engine);
        }
        if engine.simulation_state() == SimulationState::Paused {
            report_pause(engine);
            engine.resume()?;
        }
    }

    Ok(())
}

/// Play the whole trace step by step with no timer involved.
pub fn run_step_by_step(engine: &mut PlaybackEngine<TokioScheduler>) -> Result<()> {
    engine.start(ExecutionMode::StepByStep, engine.execution_speed())?;
    print_current(engine);

    while engine.simulation_state() != SimulationState::Completed {
        let before = engine.current_step_index();
        engine.step_next()?;
        if engine.current_step_index() != before {
            print_current(engine);
        }
    }

    Ok(())
}

fn print_current(engine: &PlaybackEngine<TokioScheduler>) {
    let Some(state) = engine.derived_state() else { return };
    let event = match engine.store().event_at(state.step) {
        Some(event) => event.description.as_str(),
        None => "",
    };
    println!(
        "[{:>3}] {:30} {:40} depth={}",
        state.step,
        state.current_node.name,
        event,
        state.stack_depth()
    );
}

fn report_pause(engine: &PlaybackEngine<TokioScheduler>) {
    let Some(state) = engine.derived_state() else { return };
    println!(
        "  * paused at breakpoint: {} (step {})",
        state.current_node.location(),
        state.step
    );
    for StackFrame { node, .. } in &state.call_stack {
        println!("      at {} ({})", node.name, node.location());
    }
}

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

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::types::{GraphNode, MemoryObject};

/// Observable state of a playback session.
///
/// The transient `stepping` sub-state of single-step operations is entered and
/// exited synchronously inside each call and is therefore never observable;
/// it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationState {
    /// No playback started yet (or reset)
    Idle,
    /// Playback in progress
    Running,
    /// Playback suspended; resumable
    Paused,
    /// Playback advanced past the last event
    Completed,
    /// Unrecoverable failure; only `reset` leaves this state
    Error,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// How playback advances through the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Auto-advance on a timer until paused, breakpointed, or completed
    Continuous,
    /// Advance only on explicit step commands
    StepByStep,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::StepByStep => write!(f, "step-by-step"),
        }
    }
}

/// Preset intervals between auto-advanced steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionSpeed {
    /// 2000 ms between steps
    Slow,
    /// 1000 ms between steps
    Normal,
    /// 500 ms between steps
    Fast,
    /// 100 ms between steps
    VeryFast,
}

impl ExecutionSpeed {
    /// The interval between steps for this preset.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.as_millis())
    }

    /// The interval between steps in milliseconds.
    pub fn as_millis(&self) -> u64 {
        match self {
            Self::Slow => 2000,
            Self::Normal => 1000,
            Self::Fast => 500,
            Self::VeryFast => 100,
        }
    }
}

/// One variable binding in scope at a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBinding {
    /// Type label of the value
    #[serde(rename = "type")]
    pub ty: String,
    /// Rendered value
    pub value: String,
    /// Human-readable description
    pub description: String,
}

/// One frame of a reconstructed call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// The node active in this frame
    pub node: GraphNode,
    /// Local bindings for this frame, keyed by variable name
    pub locals: BTreeMap<String, VariableBinding>,
}

/// Everything reconstructible from a trace at one step index.
///
/// Value object: recomputed on demand, never mutated in place. Two
/// computations for the same store and step are structurally equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedState {
    /// The step index this state was computed for
    pub step: usize,
    /// The node of the event at this step
    pub current_node: GraphNode,
    /// Call stack, innermost frame first (frame 0 is `current_node`)
    pub call_stack: Vec<StackFrame>,
    /// Bindings in scope at the current node, keyed by variable name
    pub variable_bindings: BTreeMap<String, VariableBinding>,
    /// Memory objects allocated up to and including this step, in ledger order
    pub memory_objects: Vec<MemoryObject>,
}

impl DerivedState {
    /// Depth of the reconstructed call stack.
    pub fn stack_depth(&self) -> usize {
        self.call_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_matches_serde() {
        for state in [
            SimulationState::Idle,
            SimulationState::Running,
            SimulationState::Paused,
            SimulationState::Completed,
            SimulationState::Error,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn test_execution_mode_serde() {
        let json = serde_json::to_string(&ExecutionMode::StepByStep).unwrap();
        assert_eq!(json, "\"step-by-step\"");
    }

    #[test]
    fn test_speed_presets() {
        assert_eq!(ExecutionSpeed::Slow.as_millis(), 2000);
        assert_eq!(ExecutionSpeed::Normal.as_millis(), 1000);
        assert_eq!(ExecutionSpeed::Fast.as_millis(), 500);
        assert_eq!(ExecutionSpeed::VeryFast.as_millis(), 100);
        assert_eq!(ExecutionSpeed::Normal.interval(), Duration::from_millis(1000));
    }
}

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

//! Error types for the trace playback engine.
//!
//! All engine failures are surfaced synchronously from the operation that
//! detected them and leave the engine state unchanged; nothing is silently
//! swallowed.

use tdb_common::types::{NodeId, SimulationState};

/// Malformed trace input, detected at load time.
///
/// The message names the first violated rule; the caller must not proceed
/// with a partially-loaded store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Two nodes share the same id
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(NodeId),
    /// An edge endpoint does not resolve to a known node
    #[error("edge {index} references unknown node id: {node_id}")]
    UnknownEdgeEndpoint {
        /// Index of the offending edge in declaration order
        index: usize,
        /// The dangling node id
        node_id: NodeId,
    },
    /// An event references a node that does not exist
    #[error("event {index} references unknown node id: {node_id}")]
    UnknownEventNode {
        /// Index of the offending event in the sequence
        index: usize,
        /// The dangling node id
        node_id: NodeId,
    },
    /// A variable-flow record references a node that does not exist
    #[error("variable flow {index} references unknown node id: {node_id}")]
    UnknownFlowNode {
        /// Index of the offending flow record
        index: usize,
        /// The dangling node id
        node_id: NodeId,
    },
    /// A node's source range has `line_end < line_start`
    #[error("node {node_id} has line_end < line_start")]
    InvalidLineRange {
        /// Id of the offending node
        node_id: NodeId,
    },
}

/// Engine operation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Trace input failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Step index or jump target outside `[0, event_count - 1]`
    #[error("step {step} out of range (total {total})")]
    OutOfRange {
        /// The requested step index
        step: usize,
        /// Total number of steps in the trace
        total: usize,
    },
    /// Command issued in a state that forbids it
    #[error("cannot {command} while {state}")]
    InvalidTransition {
        /// The rejected command
        command: &'static str,
        /// The state the engine was in
        state: SimulationState,
    },
}

/// Engine result type
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

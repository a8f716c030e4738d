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

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// One entry in a recorded execution trace.
///
/// Events are ordered by occurrence; an event's step index is implicit from
/// its position in the sequence. `timestamp_ms` is expected to be
/// monotonically non-decreasing across the sequence but this is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Id of the graph node this event executed
    pub node_id: NodeId,
    /// Human-readable label for the event
    pub description: String,
    /// Recorded timestamp in milliseconds since trace start
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl ExecutionEvent {
    /// Create a new event for the given node.
    pub fn new(node_id: impl Into<NodeId>, description: impl Into<String>, timestamp_ms: u64) -> Self {
        Self { node_id: node_id.into(), description: description.into(), timestamp_ms }
    }
}

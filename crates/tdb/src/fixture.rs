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

//! Trace fixture loading.
//!
//! A fixture is one JSON document combining the call graph, the event
//! timeline, and the optional variable-flow and allocation records:
//!
//! ```json
//! {
//!   "graph": { "nodes": [...], "edges": [...] },
//!   "events": [...],
//!   "variable_flows": [...],
//!   "allocations": [...]
//! }
//! ```

use std::{fs, path::Path};

use eyre::{Context, Result};
use serde::Deserialize;

use tdb_common::types::{ExecutionEvent, GraphEdge, GraphNode, MemoryObject, VariableFlow};
use tdb_engine::{TraceData, TraceStore};

/// On-disk fixture document
#[derive(Debug, Deserialize)]
struct Fixture {
    graph: GraphSection,
    #[serde(default)]
    events: Vec<ExecutionEvent>,
    #[serde(default)]
    variable_flows: Vec<VariableFlow>,
    #[serde(default)]
    allocations: Vec<MemoryObject>,
}

#[derive(Debug, Deserialize)]
struct GraphSection {
    nodes: Vec<GraphNode>,
    #[serde(default)]
    edges: Vec<GraphEdge>,
}

/// Parses fixture JSON into a validated trace store.
pub fn parse_trace(json: &str) -> Result<TraceStore> {
    let fixture: Fixture = serde_json::from_str(json).wrap_err("malformed trace fixture")?;
    let store = TraceStore::load(TraceData {
        nodes: fixture.graph.nodes,
        edges: fixture.graph.edges,
        events: fixture.events,
        variable_flows: fixture.variable_flows,
        allocations: fixture.allocations,
    })?;
    Ok(store)
}

/// Reads and validates a trace fixture file.
pub fn load_trace(path: &Path) -> Result<TraceStore> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read trace fixture {}", path.display()))?;
    parse_trace(&raw).wrap_err_with(|| format!("invalid trace fixture {}", path.display()))
}

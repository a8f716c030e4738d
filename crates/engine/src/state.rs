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

//! Pure derived-state reconstruction.
//!
//! [`compute_state`] rebuilds the call stack, variable bindings, and memory
//! snapshot for any step index from the trace store alone. It has no side
//! effects and no hidden state: the same `(store, step)` pair always yields a
//! structurally equal [`DerivedState`], which is what makes scrubbing
//! backward well-defined without replaying anything.

use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use tdb_common::types::{DerivedState, GraphNode, StackFrame, VariableBinding};

use crate::{error::EngineError, store::TraceStore, Result};

/// Default bound on reconstructed call-stack depth.
///
/// The data model does not forbid cycles in the call graph, so the stack walk
/// needs a hard ceiling in addition to repeated-node detection.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 64;

/// Computes the derived state at `step` with the default stack-depth bound.
pub fn compute_state(store: &TraceStore, step: usize) -> Result<DerivedState> {
    compute_state_with_depth(store, step, DEFAULT_MAX_STACK_DEPTH)
}

/// Computes the derived state at `step`.
///
/// Fails with [`EngineError::OutOfRange`] if `step` is outside
/// `[0, event_count - 1]`.
///
/// The call stack starts at the event's node (frame 0) and grows by following
/// incoming edges: among a node's incoming edges, the first one in
/// edge-declaration order wins. The walk stops when no incoming edge exists,
/// when a node id repeats (cycle; the partial stack is returned), or at
/// `max_depth` frames.
pub fn compute_state_with_depth(
    store: &TraceStore,
    step: usize,
    max_depth: usize,
) -> Result<DerivedState> {
    let event = store
        .event_at(step)
        .ok_or(EngineError::OutOfRange { step, total: store.event_count() })?;
    let current = store
        .node_by_id(&event.node_id)
        .expect("event node ids are validated at load");

    let call_stack = walk_stack(store, current, max_depth)
        .into_iter()
        .map(|node| StackFrame { node: node.clone(), locals: bindings_for(store, &node.id) })
        .collect();

    let memory_objects = store
        .allocations()
        .iter()
        .filter(|obj| obj.allocated_at_step <= step)
        .cloned()
        .collect();

    Ok(DerivedState {
        step,
        current_node: current.clone(),
        call_stack,
        variable_bindings: bindings_for(store, &current.id),
        memory_objects,
    })
}

/// Computes only the call-stack depth at `step`.
///
/// Equivalent to `compute_state(store, step)?.stack_depth()` but skips
/// bindings and memory snapshots, so forward scans (step-over/step-out) stay
/// cheap.
pub fn call_stack_len(store: &TraceStore, step: usize, max_depth: usize) -> Result<usize> {
    let event = store
        .event_at(step)
        .ok_or(EngineError::OutOfRange { step, total: store.event_count() })?;
    let current = store
        .node_by_id(&event.node_id)
        .expect("event node ids are validated at load");

    Ok(walk_stack(store, current, max_depth).len())
}

/// Walks caller frames from `current`, innermost first.
fn walk_stack<'a>(
    store: &'a TraceStore,
    current: &'a GraphNode,
    max_depth: usize,
) -> Vec<&'a GraphNode> {
    let mut stack = vec![current];
    let mut seen: HashSet<&str> = HashSet::from([current.id.as_str()]);

    while stack.len() < max_depth {
        let innermost = stack.last().expect("stack starts non-empty");
        let Some(edge) = store.edges_into(&innermost.id).next() else {
            break;
        };
        if !seen.insert(edge.from.as_str()) {
            trace!(node_id = %edge.from, "call-stack cycle detected, truncating");
            break;
        }
        let caller = store.node_by_id(&edge.from).expect("edge endpoints are validated at load");
        stack.push(caller);
    }

    stack
}

fn bindings_for(store: &TraceStore, node_id: &str) -> BTreeMap<String, VariableBinding> {
    store
        .flows_for(node_id)
        .iter()
        .map(|flow| {
            (
                flow.name.clone(),
                VariableBinding {
                    ty: flow.ty.clone(),
                    value: flow.value.clone(),
                    description: flow.description.clone(),
                },
            )
        })
        .collect()
}

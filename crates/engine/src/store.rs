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

//! Immutable, validated trace storage.
//!
//! A [`TraceStore`] owns the call graph and event sequence for the lifetime of
//! one loaded trace. It is immutable after construction and replaced wholesale
//! when a new trace is loaded; any number of derived-state computations may
//! read it concurrently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tdb_common::types::{ExecutionEvent, GraphEdge, GraphNode, MemoryObject, NodeId, VariableFlow};

use crate::error::ValidationError;

/// Raw trace input as supplied by a trace source.
///
/// `variable_flows` and `allocations` are optional enrichments; a trace
/// without them still plays back, with empty bindings and memory snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceData {
    /// Call-graph nodes
    pub nodes: Vec<GraphNode>,
    /// Call-graph edges, in declaration order
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Ordered execution events
    #[serde(default)]
    pub events: Vec<ExecutionEvent>,
    /// Variable-flow records keyed by node
    #[serde(default)]
    pub variable_flows: Vec<VariableFlow>,
    /// Simulated allocation ledger, in allocation order
    #[serde(default)]
    pub allocations: Vec<MemoryObject>,
}

/// Validated, immutable representation of one loaded trace
#[derive(Debug, Clone)]
pub struct TraceStore {
    nodes: Vec<GraphNode>,
    node_index: HashMap<NodeId, usize>,
    edges: Vec<GraphEdge>,
    /// Incoming edge indices per node, in edge-declaration order
    edges_into: HashMap<NodeId, Vec<usize>>,
    events: Vec<ExecutionEvent>,
    flows_by_node: HashMap<NodeId, Vec<VariableFlow>>,
    allocations: Vec<MemoryObject>,
}

impl TraceStore {
    /// Validates and loads raw trace data.
    ///
    /// Fails with the first violated rule: duplicate node ids, dangling edge
    /// endpoints, dangling event or flow node references, or an inverted node
    /// line range. An empty event sequence is legal and yields a store with
    /// zero steps.
    pub fn load(data: TraceData) -> Result<Self, ValidationError> {
        let TraceData { nodes, edges, events, variable_flows, allocations } = data;

        let mut node_index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), i).is_some() {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
            if node.line_end < node.line_start {
                return Err(ValidationError::InvalidLineRange { node_id: node.id.clone() });
            }
        }

        let mut edges_into: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            for endpoint in [&edge.from, &edge.to] {
                if !node_index.contains_key(endpoint) {
                    return Err(ValidationError::UnknownEdgeEndpoint {
                        index,
                        node_id: endpoint.clone(),
                    });
                }
            }
            edges_into.entry(edge.to.clone()).or_default().push(index);
        }

        for (index, event) in events.iter().enumerate() {
            if !node_index.contains_key(&event.node_id) {
                return Err(ValidationError::UnknownEventNode {
                    index,
                    node_id: event.node_id.clone(),
                });
            }
        }

        let mut flows_by_node: HashMap<NodeId, Vec<VariableFlow>> = HashMap::new();
        for (index, flow) in variable_flows.into_iter().enumerate() {
            if !node_index.contains_key(&flow.node_id) {
                return Err(ValidationError::UnknownFlowNode { index, node_id: flow.node_id });
            }
            flows_by_node.entry(flow.node_id.clone()).or_default().push(flow);
        }

        Ok(Self { nodes, node_index, edges, edges_into, events, flows_by_node, allocations })
    }

    /// Look up a node by id.
    pub fn node_by_id(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    /// Incoming edges of a node, in edge-declaration order.
    pub fn edges_into(&self, node_id: &str) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.edges_into
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.edges[i])
    }

    /// The event at a step index, if in range.
    pub fn event_at(&self, step: usize) -> Option<&ExecutionEvent> {
        self.events.get(step)
    }

    /// Number of steps in the trace.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Whether the trace has zero steps.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All nodes, in declaration order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// All edges, in declaration order.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// All events, in trace order.
    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    /// Variable-flow records attached to a node, in declaration order.
    pub fn flows_for(&self, node_id: &str) -> &[VariableFlow] {
        self.flows_by_node.get(node_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The full allocation ledger, in allocation order.
    pub fn allocations(&self) -> &[MemoryObject] {
        &self.allocations
    }
}

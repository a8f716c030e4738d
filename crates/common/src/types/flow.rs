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

/// A recorded variable-flow entry: one variable binding observed at a node.
///
/// Flow records are the binding source for derived-state computation; all
/// flows referencing the current node become its in-scope bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableFlow {
    /// Id of the node this binding belongs to
    pub node_id: NodeId,
    /// Variable name
    pub name: String,
    /// Type label of the value (e.g. `Quantity`, `list`)
    #[serde(rename = "type")]
    pub ty: String,
    /// Rendered value
    pub value: String,
    /// Human-readable description of the variable
    #[serde(default)]
    pub description: String,
}

/// One simulated allocation record in the memory ledger.
///
/// The ledger is monotonic: an object allocated at step `k` is part of the
/// memory snapshot of every step `>= k`. Deallocation is not modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryObject {
    /// Identifier of the allocation (e.g. `mem1`)
    pub id: String,
    /// Type of the allocated object (e.g. `NeuronGroup`)
    pub kind: String,
    /// Rendered size (e.g. `2.4 MB`)
    pub size: String,
    /// Simulated address (e.g. `0x7f8a4c2d1000`)
    pub address: String,
    /// Step index at which the object was allocated
    pub allocated_at_step: usize,
    /// Simulated reference count
    #[serde(default)]
    pub references: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_type_field_rename() {
        let json = r#"{
            "node_id": "net_run",
            "name": "duration",
            "type": "Quantity",
            "value": "1*second",
            "description": "The time duration for simulation"
        }"#;
        let flow: VariableFlow = serde_json::from_str(json).unwrap();
        assert_eq!(flow.ty, "Quantity");
        assert!(serde_json::to_string(&flow).unwrap().contains("\"type\""));
    }

    #[test]
    fn test_memory_object_defaults() {
        let json = r#"{
            "id": "mem1",
            "kind": "Clock",
            "size": "0.4 MB",
            "address": "0x7f8a4c2d5000",
            "allocated_at_step": 3
        }"#;
        let obj: MemoryObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.references, 0);
        assert_eq!(obj.allocated_at_step, 3);
    }
}

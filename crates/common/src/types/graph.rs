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

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Identifier of a node in the call graph.
///
/// Node ids are opaque strings chosen by the trace producer; the engine only
/// requires them to be unique within one graph.
pub type NodeId = String;

/// Kind of a traceable code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Free function
    Function,
    /// Method bound to a type/class
    Method,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Method => write!(f, "method"),
        }
    }
}

/// One traceable unit of code: a function or method with its source location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier within the graph
    pub id: NodeId,
    /// Display name (function/method name)
    pub name: String,
    /// Owning module path
    pub module: String,
    /// Path to the source file
    pub file_path: PathBuf,
    /// First line of the unit's source range (1-based)
    pub line_start: usize,
    /// Last line of the unit's source range, `line_end >= line_start`
    pub line_end: usize,
    /// Kind of the unit
    pub kind: NodeKind,
}

impl GraphNode {
    /// Whether `line` falls inside this node's source range (inclusive).
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.line_start && line <= self.line_end
    }

    /// Source location formatted as `path:line_start`
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_path.display(), self.line_start)
    }
}

/// A directed call relationship between two graph nodes.
///
/// Multiple edges between the same pair are permitted and represent repeated
/// call sites. Edge declaration order is meaningful: call-stack reconstruction
/// picks the first declared incoming edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Id of the calling node
    pub from: NodeId,
    /// Id of the called node
    pub to: NodeId,
}

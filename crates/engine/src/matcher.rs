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

//! Breakpoint matching against derived state.

use tdb_common::types::{Breakpoint, DerivedState, GraphNode};

/// Whether a breakpoint covers the given node.
///
/// A breakpoint matches when its file path equals the node's file path and
/// its line falls within the node's `[line_start, line_end]` range inclusive.
pub fn matches(breakpoint: &Breakpoint, node: &GraphNode) -> bool {
    breakpoint.file_path == node.file_path && node.contains_line(breakpoint.line)
}

/// Returns the first registered breakpoint covering the state's current node.
///
/// Short-circuits on the first hit; the matched breakpoint is returned so the
/// caller can report which one fired.
pub fn first_match<'a>(
    breakpoints: impl IntoIterator<Item = &'a Breakpoint>,
    state: &DerivedState,
) -> Option<&'a Breakpoint> {
    breakpoints.into_iter().find(|bp| matches(bp, &state.current_node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tdb_common::types::NodeKind;

    fn node(file: &str, start: usize, end: usize) -> GraphNode {
        GraphNode {
            id: "n1".to_string(),
            name: "run".to_string(),
            module: "core".to_string(),
            file_path: file.into(),
            line_start: start,
            line_end: end,
            kind: NodeKind::Function,
        }
    }

    fn state_for(node: GraphNode) -> DerivedState {
        DerivedState {
            step: 0,
            call_stack: vec![],
            variable_bindings: BTreeMap::new(),
            memory_objects: vec![],
            current_node: node,
        }
    }

    #[test]
    fn test_matches_inside_range() {
        let n = node("f.py", 3, 7);
        assert!(matches(&Breakpoint::new("f.py", 5), &n));
        assert!(matches(&Breakpoint::new("f.py", 3), &n));
        assert!(matches(&Breakpoint::new("f.py", 7), &n));
    }

    #[test]
    fn test_no_match_outside_range_or_file() {
        let n = node("f.py", 3, 7);
        assert!(!matches(&Breakpoint::new("f.py", 9), &n));
        assert!(!matches(&Breakpoint::new("g.py", 5), &n));
    }

    #[test]
    fn test_first_match_reports_first_registered() {
        let state = state_for(node("f.py", 3, 7));
        let bps = vec![
            Breakpoint::new("g.py", 5),
            Breakpoint::new("f.py", 4),
            Breakpoint::new("f.py", 6),
        ];
        let hit = first_match(&bps, &state).unwrap();
        assert_eq!(hit, &Breakpoint::new("f.py", 4));
    }

    #[test]
    fn test_first_match_none() {
        let state = state_for(node("f.py", 3, 7));
        assert!(first_match(&[], &state).is_none());
        assert!(first_match(&[Breakpoint::new("f.py", 100)], &state).is_none());
    }
}

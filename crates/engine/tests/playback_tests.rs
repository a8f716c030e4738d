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

//! End-to-end tests for the playback engine state machine.

use std::time::Duration;

use tdb_common::types::{
    Breakpoint, ExecutionEvent, ExecutionMode, GraphEdge, GraphNode, NodeKind, SimulationState,
    VariableFlow,
};
use tdb_engine::{
    call_stack_len, compute_state, EngineError, LogKind, ManualScheduler, PlaybackEngine,
    TraceData, TraceStore, DEFAULT_MAX_STACK_DEPTH,
};

fn node(id: &str, file: &str, start: usize, end: usize) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        name: id.to_string(),
        module: "core".to_string(),
        file_path: file.into(),
        line_start: start,
        line_end: end,
        kind: NodeKind::Function,
    }
}

fn edge(from: &str, to: &str) -> GraphEdge {
    GraphEdge { from: from.to_string(), to: to.to_string() }
}

fn event(node_id: &str) -> ExecutionEvent {
    ExecutionEvent::new(node_id, format!("execute {node_id}"), 0)
}

/// main calls helper calls inner; events walk down and back up.
fn nested_store() -> TraceStore {
    TraceStore::load(TraceData {
        nodes: vec![
            node("main", "main.py", 1, 20),
            node("helper", "helper.py", 1, 30),
            node("inner", "inner.py", 5, 9),
        ],
        edges: vec![edge("main", "helper"), edge("helper", "inner")],
        events: vec![event("main"), event("helper"), event("inner"), event("helper"), event("main")],
        ..Default::default()
    })
    .unwrap()
}

fn engine(store: TraceStore) -> PlaybackEngine<ManualScheduler> {
    PlaybackEngine::new(store, ManualScheduler::new())
}

#[test]
fn monotonic_progress_to_completion() {
    let mut eng = engine(nested_store());
    let count = eng.store().event_count();

    for _ in 0..count {
        eng.step_next().unwrap();
    }
    assert_eq!(eng.simulation_state(), SimulationState::Completed);
    assert_eq!(eng.current_step_index(), count - 1);
    assert!(eng
        .event_log()
        .iter()
        .any(|entry| entry.kind == LogKind::ExecutionComplete));

    // Further steps stay clamped and completed
    eng.step_next().unwrap();
    assert_eq!(eng.current_step_index(), count - 1);
    assert_eq!(eng.simulation_state(), SimulationState::Completed);
}

#[test]
fn step_back_clamps_at_zero() {
    let mut eng = engine(nested_store());
    eng.step_back().unwrap();
    assert_eq!(eng.current_step_index(), 0);

    eng.step_next().unwrap();
    eng.step_back().unwrap();
    eng.step_back().unwrap();
    assert_eq!(eng.current_step_index(), 0);
}

#[test]
fn jump_out_of_range_is_an_error() {
    let mut eng = engine(nested_store());
    let count = eng.store().event_count();
    let err = eng.jump_to_step(count).unwrap_err();
    assert_eq!(err, EngineError::OutOfRange { step: count, total: count });
    // Engine untouched
    assert_eq!(eng.current_step_index(), 0);
    assert_eq!(eng.simulation_state(), SimulationState::Idle);
}

#[test]
fn jump_while_running_pauses_first() {
    let mut eng = engine(nested_store());
    eng.start(ExecutionMode::Continuous, Duration::from_millis(100)).unwrap();
    assert!(eng.armed_timer().is_some());

    eng.jump_to_step(3).unwrap();
    assert_eq!(eng.simulation_state(), SimulationState::Paused);
    assert_eq!(eng.current_step_index(), 3);
    assert!(eng.armed_timer().is_none());
}

#[test]
fn step_over_lands_at_same_or_shallower_depth() {
    let store = nested_store();
    let count = store.event_count();
    for start in 0..count - 1 {
        let mut eng = engine(store.clone());
        eng.jump_to_step(start).unwrap();
        let depth = call_stack_len(eng.store(), start, DEFAULT_MAX_STACK_DEPTH).unwrap();

        eng.step_over().unwrap();
        let landed = eng.current_step_index();
        assert!(landed > start);
        let landed_depth = call_stack_len(eng.store(), landed, DEFAULT_MAX_STACK_DEPTH).unwrap();
        assert!(landed_depth <= depth || landed == count - 1);
    }
}

#[test]
fn step_over_skips_deeper_frames() {
    // At step 1 (helper, depth 2) the next step at depth <= 2 is step 3,
    // skipping step 2 (inner, depth 3).
    let mut eng = engine(nested_store());
    eng.jump_to_step(1).unwrap();
    eng.step_over().unwrap();
    assert_eq!(eng.current_step_index(), 3);

    // Skipped steps are not logged as visited history
    assert!(!eng
        .execution_history()
        .iter()
        .any(|entry| entry.node_id == "inner"));
}

#[test]
fn step_out_requires_strictly_shallower_depth() {
    let mut eng = engine(nested_store());
    eng.jump_to_step(1).unwrap();
    eng.step_out().unwrap();
    // helper at depth 2: first strictly shallower step is main at step 4
    assert_eq!(eng.current_step_index(), 4);
}

#[test]
fn step_out_without_target_lands_on_last_step() {
    let store = TraceStore::load(TraceData {
        nodes: vec![
            node("main", "main.py", 1, 20),
            node("inner", "inner.py", 5, 9),
        ],
        edges: vec![edge("main", "inner")],
        events: vec![event("inner"), event("inner"), event("inner")],
        ..Default::default()
    })
    .unwrap();

    let mut eng = engine(store);
    eng.step_out().unwrap();
    assert_eq!(eng.current_step_index(), 2);
    assert_ne!(eng.simulation_state(), SimulationState::Completed);
}

#[test]
fn linear_trace_reconstructs_full_chain() {
    let store = TraceStore::load(TraceData {
        nodes: vec![
            node("a", "a.py", 1, 10),
            node("b", "b.py", 1, 10),
            node("c", "c.py", 1, 10),
        ],
        edges: vec![edge("a", "b"), edge("b", "c")],
        events: vec![event("a"), event("b"), event("c")],
        ..Default::default()
    })
    .unwrap();

    let state = compute_state(&store, 2).unwrap();
    let ids: Vec<_> = state.call_stack.iter().map(|f| f.node.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
}

#[test]
fn cyclic_graph_stack_walk_terminates() {
    let store = TraceStore::load(TraceData {
        nodes: vec![node("a", "a.py", 1, 10), node("b", "b.py", 1, 10)],
        edges: vec![edge("a", "b"), edge("b", "a")],
        events: vec![event("a")],
        ..Default::default()
    })
    .unwrap();

    let state = compute_state(&store, 0).unwrap();
    assert!(state.stack_depth() <= DEFAULT_MAX_STACK_DEPTH);
    assert_eq!(state.stack_depth(), 2); // stops at the first repeated node
}

#[test]
fn breakpoint_pauses_continuous_playback() {
    let mut eng = engine(nested_store());
    // inner.py lines 5..=9; line 7 is inside
    assert!(eng.add_breakpoint(Breakpoint::new("inner.py", 7)));

    eng.start(ExecutionMode::Continuous, Duration::from_millis(100)).unwrap();
    let mut guard = 0;
    while eng.simulation_state() == SimulationState::Running {
        let id = eng.armed_timer().expect("running continuous playback keeps a timer armed");
        eng.on_tick(id).unwrap();
        guard += 1;
        assert!(guard < 100, "continuous playback never paused");
    }

    assert_eq!(eng.simulation_state(), SimulationState::Paused);
    assert_eq!(eng.current_step_index(), 2); // the inner event
    assert!(eng.armed_timer().is_none());
    assert!(eng.event_log().iter().any(|entry| entry.kind == LogKind::Breakpoint));
}

#[test]
fn breakpoint_outside_range_never_hits() {
    let mut eng = engine(nested_store());
    eng.add_breakpoint(Breakpoint::new("inner.py", 12)); // outside 5..=9

    eng.start(ExecutionMode::Continuous, Duration::from_millis(100)).unwrap();
    while let Some(id) = eng.armed_timer() {
        eng.on_tick(id).unwrap();
    }
    assert_eq!(eng.simulation_state(), SimulationState::Completed);
}

#[test]
fn breakpoint_add_is_idempotent() {
    let mut eng = engine(nested_store());
    assert!(eng.add_breakpoint(Breakpoint::new("f.py", 5)));
    assert!(!eng.add_breakpoint(Breakpoint::new("f.py", 5)));

    assert_eq!(eng.breakpoints().len(), 1);
    let add_logs = eng
        .event_log()
        .iter()
        .filter(|entry| entry.kind == LogKind::BreakpointAdd)
        .count();
    assert_eq!(add_logs, 1);

    assert!(eng.remove_breakpoint(&Breakpoint::new("f.py", 5)));
    assert!(!eng.remove_breakpoint(&Breakpoint::new("f.py", 5)));
    assert!(eng.breakpoints().is_empty());
}

#[test]
fn watch_list_is_idempotent_and_drives_verbose_logs() {
    let store = TraceStore::load(TraceData {
        nodes: vec![node("a", "a.py", 1, 10), node("b", "b.py", 1, 10)],
        edges: vec![],
        events: vec![event("a"), event("b")],
        variable_flows: vec![
            VariableFlow {
                node_id: "a".into(),
                name: "t".into(),
                ty: "Quantity".into(),
                value: "0*second".into(),
                description: String::new(),
            },
            VariableFlow {
                node_id: "b".into(),
                name: "t".into(),
                ty: "Quantity".into(),
                value: "1*second".into(),
                description: String::new(),
            },
        ],
        ..Default::default()
    })
    .unwrap();

    let mut eng = engine(store);
    assert!(eng.add_watched_variable("t"));
    assert!(!eng.add_watched_variable("t"));

    eng.step_next().unwrap(); // bookkeeping for step 0 is skipped while idle... step to 1
    eng.step_back().unwrap();
    eng.step_next().unwrap();

    // The change a -> b (0*second -> 1*second) is recorded
    assert!(eng
        .variable_changes()
        .iter()
        .any(|change| change.name == "t" && change.new_value == "1*second"));
    assert!(eng.event_log().iter().any(|entry| entry.kind == LogKind::VariableChange));

    assert!(eng.remove_watched_variable("t"));
    assert!(!eng.remove_watched_variable("t"));
}

#[test]
fn history_deduplicates_consecutive_same_node_steps() {
    let store = TraceStore::load(TraceData {
        nodes: vec![node("a", "a.py", 1, 10), node("b", "b.py", 1, 10)],
        events: vec![event("a"), event("a"), event("b"), event("b")],
        ..Default::default()
    })
    .unwrap();

    let mut eng = engine(store);
    for _ in 0..4 {
        eng.step_next().unwrap();
    }
    let ids: Vec<_> = eng.execution_history().iter().map(|h| h.node_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn reset_clears_all_accumulators() {
    let mut eng = engine(nested_store());
    eng.start(ExecutionMode::StepByStep, Duration::from_millis(100)).unwrap();
    eng.step_next().unwrap();
    eng.step_next().unwrap();
    assert!(!eng.event_log().is_empty());
    assert!(!eng.execution_history().is_empty());
    assert!(!eng.memory_snapshots().is_empty());

    eng.reset();
    assert_eq!(eng.current_step_index(), 0);
    assert_eq!(eng.simulation_state(), SimulationState::Idle);
    assert!(eng.event_log().is_empty());
    assert!(eng.execution_history().is_empty());
    assert!(eng.variable_changes().is_empty());
    assert!(eng.memory_snapshots().is_empty());
    assert!(eng.derived_state().is_none());
}

#[test]
fn reset_keeps_breakpoints_and_watches() {
    let mut eng = engine(nested_store());
    eng.add_breakpoint(Breakpoint::new("f.py", 5));
    eng.add_watched_variable("t");
    eng.reset();
    assert_eq!(eng.breakpoints().len(), 1);
    assert_eq!(eng.watched_variables().len(), 1);
}

#[test]
fn stale_tick_after_pause_is_ignored() {
    let mut eng = engine(nested_store());
    eng.start(ExecutionMode::Continuous, Duration::from_millis(100)).unwrap();
    let id = eng.armed_timer().unwrap();

    eng.pause().unwrap();
    let at = eng.current_step_index();

    // The tick raced the pause and loses: no step advance fires.
    eng.on_tick(id).unwrap();
    assert_eq!(eng.current_step_index(), at);
    assert_eq!(eng.simulation_state(), SimulationState::Paused);
}

#[test]
fn change_speed_rearms_timer_without_losing_position() {
    let mut eng = engine(nested_store());
    eng.start(ExecutionMode::Continuous, Duration::from_millis(1000)).unwrap();
    let first = eng.armed_timer().unwrap();
    let at = eng.current_step_index();

    eng.change_speed(Duration::from_millis(100));
    let second = eng.armed_timer().unwrap();
    assert_ne!(first, second);
    assert_eq!(eng.current_step_index(), at);
    assert_eq!(eng.execution_speed(), Duration::from_millis(100));

    // The old timer's ticks no longer move the engine
    eng.on_tick(first).unwrap();
    assert_eq!(eng.current_step_index(), at);
}

#[test]
fn resume_from_idle_is_an_invalid_transition() {
    let mut eng = engine(nested_store());
    let err = eng.resume().unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTransition { command: "resume", state: SimulationState::Idle }
    );

    let err = eng.pause().unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTransition { command: "pause", state: SimulationState::Idle }
    );
}

#[test]
fn start_twice_is_an_invalid_transition() {
    let mut eng = engine(nested_store());
    eng.start(ExecutionMode::StepByStep, Duration::from_millis(100)).unwrap();
    let err = eng.start(ExecutionMode::StepByStep, Duration::from_millis(100)).unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTransition { command: "start", state: SimulationState::Running }
    );
}

#[test]
fn start_after_completion_resets_and_replays() {
    let mut eng = engine(nested_store());
    let count = eng.store().event_count();
    for _ in 0..count {
        eng.step_next().unwrap();
    }
    assert_eq!(eng.simulation_state(), SimulationState::Completed);

    eng.start(ExecutionMode::StepByStep, Duration::from_millis(100)).unwrap();
    assert_eq!(eng.simulation_state(), SimulationState::Running);
    assert_eq!(eng.current_step_index(), 0);
    // History restarts from scratch
    assert_eq!(eng.execution_history().len(), 1);
}

#[test]
fn empty_trace_operations_report_completed() {
    let store = TraceStore::load(TraceData {
        nodes: vec![node("a", "a.py", 1, 10)],
        ..Default::default()
    })
    .unwrap();

    let mut eng = engine(store);
    assert_eq!(eng.progress_percentage(), 0.0);

    eng.step_next().unwrap();
    assert_eq!(eng.simulation_state(), SimulationState::Completed);

    let mut eng2 = PlaybackEngine::new(
        TraceStore::load(TraceData {
            nodes: vec![node("a", "a.py", 1, 10)],
            ..Default::default()
        })
        .unwrap(),
        ManualScheduler::new(),
    );
    eng2.start(ExecutionMode::Continuous, Duration::from_millis(100)).unwrap();
    assert_eq!(eng2.simulation_state(), SimulationState::Completed);
    assert!(eng2.armed_timer().is_none());
}

#[test]
fn progress_percentage_tracks_position() {
    let mut eng = engine(nested_store());
    assert_eq!(eng.progress_percentage(), 0.0);
    eng.jump_to_step(2).unwrap();
    assert!((eng.progress_percentage() - 50.0).abs() < f64::EPSILON);
    eng.jump_to_step(4).unwrap();
    assert!((eng.progress_percentage() - 100.0).abs() < f64::EPSILON);
}

#[test]
fn scrubbing_backward_is_deterministic() {
    let store = nested_store();
    for step in 0..store.event_count() {
        let forward = compute_state(&store, step).unwrap();
        let backward = compute_state(&store, step).unwrap();
        assert_eq!(forward, backward);
    }

    // Via the engine: jump around arbitrarily, derived state only depends on
    // the index.
    let mut eng = engine(store);
    eng.jump_to_step(3).unwrap();
    let first = eng.derived_state().unwrap().clone();
    eng.jump_to_step(0).unwrap();
    eng.jump_to_step(3).unwrap();
    assert_eq!(eng.derived_state().unwrap(), &first);
}

#[test]
fn snapshot_exposes_presentation_view() {
    let mut eng = engine(nested_store());
    eng.add_breakpoint(Breakpoint::new("inner.py", 7));
    eng.jump_to_step(1).unwrap();

    let snap = eng.snapshot();
    assert_eq!(snap.simulation_state, SimulationState::Paused);
    assert_eq!(snap.current_step_index, 1);
    assert_eq!(snap.breakpoints.len(), 1);
    assert_eq!(snap.derived_state.unwrap().current_node.id, "helper");
    assert!(snap.progress_percentage > 0.0);

    // The view serializes for host consumption
    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["simulation_state"], "paused");
}

#[test]
fn trace_data_deserializes_from_fixture_json() {
    let data: TraceData = serde_json::from_str(
        r#"{
            "nodes": [{
                "id": "magic_run",
                "name": "run",
                "module": "core.magic",
                "file_path": "core/magic.py",
                "line_start": 12,
                "line_end": 58,
                "kind": "function"
            }],
            "edges": [],
            "events": [{"node_id": "magic_run", "description": "run()", "timestamp_ms": 0}]
        }"#,
    )
    .unwrap();

    let store = TraceStore::load(data).unwrap();
    assert_eq!(store.event_count(), 1);
    let state = compute_state(&store, 0).unwrap();
    assert_eq!(state.current_node.name, "run");
}

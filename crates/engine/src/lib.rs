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

//! TDB Engine - Trace playback over recorded execution traces
//!
//! The engine turns a recorded trace (a static call graph plus an ordered
//! sequence of execution events) into a time-travel debugging session:
//! scrub, step (into/over/out), set breakpoints, and watch derived state
//! (call stack, variable bindings, memory snapshots) update deterministically
//! in both directions.
//!
//! Components:
//! - [`store`] - immutable, validated trace representation
//! - [`state`] - pure derived-state reconstruction for any step index
//! - [`matcher`] - breakpoint matching against source ranges
//! - [`scheduler`] - injectable timer capability for continuous playback
//! - [`playback`] - the playback state machine

pub mod error;
pub use error::*;

pub mod matcher;
pub use matcher::*;

pub mod playback;
pub use playback::*;

pub mod scheduler;
pub use scheduler::*;

pub mod state;
pub use state::*;

pub mod store;
pub use store::*;

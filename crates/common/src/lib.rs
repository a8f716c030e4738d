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

//! TDB Common - Shared functionality for TDB components
//!
//! This crate provides the data types shared between the playback engine and
//! its hosts (call graphs, execution events, breakpoints, derived state), plus
//! the logging setup used by every TDB binary and test suite.

/// Common types used throughout TDB, including call graphs, execution events,
/// breakpoints, and derived execution state
pub mod types;

/// Logging setup and utilities for consistent logging across TDB components
pub mod logging;

pub use logging::*;

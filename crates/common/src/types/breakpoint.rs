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

use std::{fmt::Display, path::PathBuf, str::FromStr};

use eyre::{bail, eyre, Error, Result};
use serde::{Deserialize, Serialize};

/// A user-defined pause condition at a source location.
///
/// A breakpoint hits when playback reaches a node whose source file matches
/// `file_path` and whose line range contains `line` (inclusive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Breakpoint {
    /// Path to the source file
    pub file_path: PathBuf,
    /// Line number in the source file (1-based)
    pub line: usize,
}

impl Breakpoint {
    /// Creates a new breakpoint at the given file and line.
    pub fn new(file_path: impl Into<PathBuf>, line: usize) -> Self {
        Self { file_path: file_path.into(), line }
    }
}

impl Display for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_path.display(), self.line)
    }
}

impl FromStr for Breakpoint {
    type Err = Error;

    /// Parses a breakpoint from a string in the format `<path>:<line>`.
    /// Examples:
    /// - `core/network.py:100`
    /// - `src/main.rs:42`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let Some((path_str, line_str)) = trimmed.rsplit_once(':') else {
            bail!("Invalid breakpoint format. Expected <path>:<line>, got: {s}");
        };
        if path_str.is_empty() {
            bail!("Invalid breakpoint format. Missing file path in: {s}");
        }
        let line = line_str.parse::<usize>().map_err(|e| eyre!("Invalid line number: {e}"))?;

        Ok(Self { file_path: PathBuf::from(path_str), line })
    }
}

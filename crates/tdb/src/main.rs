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

//! TDB - Trace Debugger
//!
//! A time-travel debugger over recorded execution traces.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;
use itertools::Itertools;

use tdb_common::types::{Breakpoint, ExecutionSpeed};
use tdb_engine::{PlaybackEngine, TraceStore};

mod config;
mod driver;
mod fixture;

use config::Config;
use driver::TokioScheduler;

/// Command-line interface for TDB
#[derive(Debug, Parser)]
#[command(name = "tdb")]
#[command(about = "Trace Debugger - time-travel playback over recorded execution traces")]
#[command(version)]
pub struct Cli {
    /// Path to a config file (default: ~/.tdb.toml)
    #[arg(long, env = "TDB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable the rolling log file, keeping console logging only
    #[arg(long)]
    pub no_file_log: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Playback speed presets
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SpeedArg {
    /// 2000ms per step
    Slow,
    /// 1000ms per step
    Normal,
    /// 500ms per step
    Fast,
    /// 100ms per step
    VeryFast,
}

impl From<SpeedArg> for ExecutionSpeed {
    fn from(arg: SpeedArg) -> Self {
        match arg {
            SpeedArg::Slow => Self::Slow,
            SpeedArg::Normal => Self::Normal,
            SpeedArg::Fast => Self::Fast,
            SpeedArg::VeryFast => Self::VeryFast,
        }
    }
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Play a recorded trace from start to finish
    Run {
        /// Path to the trace fixture (JSON)
        fixture: PathBuf,

        /// Drive playback one step at a time instead of on a timer
        #[arg(long)]
        step_by_step: bool,

        /// Speed preset for continuous playback
        #[arg(long, value_enum)]
        speed: Option<SpeedArg>,

        /// Tick interval in milliseconds, overriding the preset and config
        #[arg(long)]
        speed_ms: Option<u64>,

        /// Breakpoint as <file>:<line>; may be given multiple times
        #[arg(long = "breakpoint", short = 'b')]
        breakpoints: Vec<Breakpoint>,

        /// Variable name to watch; may be given multiple times
        #[arg(long = "watch", short = 'w')]
        watches: Vec<String>,
    },
    /// Print a summary of a trace fixture without playing it
    Info {
        /// Path to the trace fixture (JSON)
        fixture: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tdb_common::init_logging("tdb", config.logging.file_logging && !cli.no_file_log)?;

    match cli.command {
        Commands::Run { fixture, step_by_step, speed, speed_ms, breakpoints, watches } => {
            let store = fixture::load_trace(&fixture)?;
            tracing::info!(
                fixture = %fixture.display(),
                events = store.event_count(),
                "trace loaded"
            );

            let interval = speed_ms
                .map(Duration::from_millis)
                .or_else(|| speed.map(|s| ExecutionSpeed::from(s).interval()))
                .unwrap_or(Duration::from_millis(config.playback.speed_ms));

            let (scheduler, mut ticks) = TokioScheduler::new();
            let mut engine = PlaybackEngine::with_max_stack_depth(
                store,
                scheduler,
                config.playback.max_stack_depth,
            );
            for bp in breakpoints {
                engine.add_breakpoint(bp);
            }
            for name in watches {
                engine.add_watched_variable(name);
            }

            if step_by_step {
                driver::run_step_by_step(&mut engine)?;
            } else {
                driver::run_continuous(&mut engine, &mut ticks, interval).await?;
            }
            print_run_summary(&engine);
        }
        Commands::Info { fixture } => {
            let store = fixture::load_trace(&fixture)?;
            print_trace_summary(&fixture, &store);
        }
    }

    Ok(())
}

/// Print the post-run report: log totals, variable changes, final memory.
fn print_run_summary(engine: &PlaybackEngine<TokioScheduler>) {
    println!();
    println!(
        "Completed: {} steps visited, {} distinct positions, progress {:.0}%",
        engine.current_step_index() + 1,
        engine.execution_history().len(),
        engine.progress_percentage()
    );

    let changes = engine.variable_changes();
    if !changes.is_empty() {
        println!("Variable changes:");
        for change in changes {
            println!(
                "  step {:>3}  {} = {} (was {})",
                change.step, change.name, change.new_value, change.old_value
            );
        }
    }

    if let Some(snapshot) = engine.memory_snapshots().last() {
        if !snapshot.objects.is_empty() {
            let total = snapshot.objects.len();
            let kinds = snapshot.objects.iter().map(|obj| obj.kind.as_str()).sorted().dedup();
            println!("Live objects at end: {} ({})", total, kinds.format(", "));
        }
    }

    println!("Event log: {} entries", engine.event_log().len());
    for entry in engine.event_log() {
        println!("  [{:>3}] {:18} {}", entry.step, entry.kind.to_string(), entry.message);
    }
}

/// Print the static shape of a trace: graph, timeline, allocation ledger.
fn print_trace_summary(path: &std::path::Path, store: &TraceStore) {
    println!("Trace: {}", path.display());
    println!(
        "  {} nodes, {} edges, {} events, {} allocations",
        store.nodes().len(),
        store.edges().len(),
        store.event_count(),
        store.allocations().len()
    );

    println!("Call graph:");
    for (module, nodes) in &store.nodes().iter().chunk_by(|node| node.module.as_str()) {
        println!("  {module}");
        for node in nodes {
            println!("    {} ({}) [{}]", node.name, node.location(), node.kind);
        }
    }

    println!("Timeline:");
    for (step, event) in store.events().iter().enumerate() {
        let name = store.node_by_id(&event.node_id).map(|n| n.name.as_str()).unwrap_or("?");
        println!("  [{:>3}] {:30} {}", step, name, event.description);
    }

    if !store.allocations().is_empty() {
        println!("Allocations:");
        for obj in store.allocations() {
            println!(
                "  step {:>3}  {:14} {:12} {} ({} refs)",
                obj.allocated_at_step, obj.kind, obj.size, obj.address, obj.references
            );
        }
    }
}

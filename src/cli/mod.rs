//! Command-line interface for callwatch.
//!
//! Drives the call-detection core with in-process providers: number
//! normalization, contact lookups and replay of recorded call events.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod lookup;
pub mod normalize;
pub mod replay;

/// callwatch - caller identification against the device contact book
#[derive(Parser)]
#[command(name = "callwatch")]
#[command(about = "Call-event state machine and contact matching for companion telephony apps")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the normalized form of a phone number
    Normalize(normalize::NormalizeArgs),
    /// Look a number up in a contacts export
    Lookup(lookup::LookupArgs),
    /// Replay recorded call events through a full session
    Replay(replay::ReplayArgs),
}

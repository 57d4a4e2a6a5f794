//! CLI argument parsing for flowtrace

use crate::config::ReconstructionConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for reconstructed traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "flowtrace")]
#[command(version)]
#[command(
    about = "Reconstruct execution and message traces from monitored flow events",
    long_about = None
)]
pub struct Cli {
    /// Trace batches to read: a JSON array or one JSON document per line
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Reconstruction settings (TOML)
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Number of traces reconstructed in parallel
    #[arg(short = 'j', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Compare constructor signatures verbatim
    #[arg(long = "no-java-constructors")]
    pub no_java_constructors: bool,

    /// Only match call markers that reference the callee exactly
    #[arg(long = "no-call-detection")]
    pub no_call_detection: bool,

    /// Do not fail the run when traces are invalid
    #[arg(long = "ignore-invalid")]
    pub ignore_invalid: bool,

    /// Traces to reconstruct (e.g., --select-traces select=1,2,10-20)
    #[arg(short = 'e', long = "select-traces", value_name = "EXPR")]
    pub select: Option<String>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Show only the summary of outcomes
    #[arg(short = 'c', long = "summary")]
    pub summary_only: bool,

    /// Omit call and reply messages from text output
    #[arg(long = "no-messages")]
    pub no_messages: bool,

    /// Write output to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, mut config: ReconstructionConfig) -> ReconstructionConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.no_java_constructors {
            config.enhance_java_constructors = false;
        }
        if self.no_call_detection {
            config.enhance_call_detection = false;
        }
        if self.ignore_invalid {
            config.ignore_invalid_traces = true;
        }
        config
    }
}

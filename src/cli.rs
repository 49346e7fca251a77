// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

#[derive(Parser, Debug)]
#[command(
    name = "vesper",
    about = "Voice-assistant coordination plane: event bus, session manager, tool/execution layer, and memory subsystem",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: audio capture through agent dispatch and TTS.
    ///
    /// Audio capture, the wakeword model, VAD, ASR, and TTS are external
    /// collaborators; this binary wires them through their trait boundaries
    /// using the bundled mock implementations, since no real driver is in
    /// scope.
    Run {
        /// Path to an additional config file, merged last (highest priority).
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Run the batch evaluator against a JSONL case file and print a JSON report.
    Eval {
        /// Path to the JSONL file of evaluation cases.
        #[arg(value_name = "CASES")]
        cases: PathBuf,
        /// Path to an additional config file, merged last (highest priority).
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Write the report here instead of stdout.
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Serve the MCP tool surface over newline-delimited JSON on stdin/stdout.
    Mcp {
        /// Path to an additional config file, merged last (highest priority).
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Print the effective merged configuration and exit.
    ShowConfig {
        /// Path to an additional config file, merged last (highest priority).
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

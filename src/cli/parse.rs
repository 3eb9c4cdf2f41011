//! CLI parse: clap types for patchchain. No behavior; definitions only.

use crate::types::Signature;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Patchchain CLI - build and verify versioned file trees from patch chains
#[derive(Parser)]
#[command(name = "patchchain")]
#[command(about = "Fingerprint, diff and combine versioned file trees")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the digest of a tree
    Digest {
        /// Root of the tree
        path: PathBuf,
    },
    /// Show the sidecar record of a patch tree
    Inspect {
        /// Root of the patch tree
        patch: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Write a patch that turns one tree into another
    Diff {
        /// Tree the patch applies to
        before: PathBuf,
        /// Tree the patch should produce
        after: PathBuf,
        /// Directory to write the patch into (must be empty or missing)
        out: PathBuf,
        /// Signature of the transaction that published `before` (hex)
        #[arg(long)]
        previous_signature: Signature,
    },
    /// Validate a patch against its base and write the merged tree
    Combine {
        /// Base tree
        before: PathBuf,
        /// Patch tree
        patch: PathBuf,
        /// Signature of the base version according to chain state (hex)
        #[arg(long)]
        signature: Signature,
        /// Where to place the merged tree (must not exist)
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

impl Commands {
    /// Command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Digest { .. } => "digest",
            Commands::Inspect { .. } => "inspect",
            Commands::Diff { .. } => "diff",
            Commands::Combine { .. } => "combine",
            Commands::Config => "config",
        }
    }
}

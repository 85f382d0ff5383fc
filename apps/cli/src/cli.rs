use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "vegh",
    version,
    about = "Snapshot, verify and ship project directories"
)]
pub(crate) struct Cli {
    /// Debug logging (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Pack a directory into a snapshot.
    Snap(SnapArgs),

    /// List what `snap` would pack without writing anything.
    DryRun(DryRunArgs),

    /// Extract a snapshot into a directory.
    Restore {
        /// Snapshot file.
        file: PathBuf,
        /// Destination directory.
        #[arg(default_value = ".")]
        out_dir: PathBuf,
    },

    /// List the entries of a snapshot.
    List {
        file: PathBuf,
    },

    /// Verify a snapshot and show its metadata.
    Check {
        file: PathBuf,
    },

    /// Count lines of code per language inside a snapshot.
    Loc {
        file: PathBuf,
    },

    /// Upload a snapshot to a remote endpoint.
    Send(SendArgs),

    /// Manage stored preferences.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub(crate) struct SnapArgs {
    /// Source directory.
    pub(crate) path: PathBuf,

    /// Output file (default: `<dir name>.snap`).
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,

    /// Compression level.
    #[arg(short, long, default_value_t = vegh_snapshot::DEFAULT_LEVEL,
          value_parser = clap::value_parser!(i32).range(1..=21))]
    pub(crate) level: i32,

    /// Comment stored in the snapshot metadata.
    #[arg(short, long)]
    pub(crate) comment: Option<String>,

    /// Author stored in the metadata (default: stored preference, then host name).
    #[arg(long)]
    pub(crate) author: Option<String>,

    #[command(flatten)]
    pub(crate) filter: FilterArgs,
}

#[derive(Debug, Args)]
pub(crate) struct DryRunArgs {
    /// Source directory.
    pub(crate) path: PathBuf,

    #[command(flatten)]
    pub(crate) filter: FilterArgs,
}

#[derive(Debug, Args)]
pub(crate) struct FilterArgs {
    /// Glob of files to force in, even when hidden or excluded. Repeatable.
    #[arg(short, long = "include")]
    pub(crate) include: Vec<String>,

    /// Glob of files to leave out. Repeatable.
    #[arg(short, long = "exclude")]
    pub(crate) exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub(crate) struct SendArgs {
    /// Snapshot file to upload.
    pub(crate) file: PathBuf,

    /// Target URL (default: stored `url` preference).
    pub(crate) url: Option<String>,

    /// Bearer token (default: stored `auth` preference).
    #[arg(long, env = "VEGH_AUTH", hide_env_values = true)]
    pub(crate) auth: Option<String>,

    /// Use chunked upload regardless of file size.
    #[arg(long)]
    pub(crate) force_chunk: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum ConfigCommand {
    /// Store a preference (`url`, `auth` or `author`). An empty value clears it.
    Set { key: String, value: String },

    /// Print stored preferences.
    Show,

    /// Delete all stored preferences.
    Reset,
}

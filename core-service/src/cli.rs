use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tagsync")]
#[command(about = "Synchronize ID3 tags between two music trees")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to <data dir>/tagsync/config.json)
    #[arg(short = 'C', long, global = true, env = "TAGSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan Source A and refresh library membership
    Scan,
    /// List files flagged as library members
    Members,
    /// Manage Source A to Source B pairings
    Pair {
        #[command(subcommand)]
        cmd: PairCmd,
    },
    /// Show pending updates and conflicts without writing
    Preview,
    /// Apply every conflict-free pending update
    Run,
    /// Reconcile the bidirectional tags of one pair
    Reconcile {
        /// Source A file of the pair
        source_a_path: String,
    },
    /// Forget files that no longer exist in Source A
    Prune,
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(Subcommand)]
pub enum PairCmd {
    /// Suggest counterparts by file name
    Suggest {
        /// Save every matched suggestion
        #[arg(long)]
        save: bool,
    },
    /// Save pairings from a JSON array of {sourceAPath, sourceBPath}
    Save {
        /// JSON file, or `-` for stdin
        file: PathBuf,
    },
    /// List saved pairings
    List,
    /// Remove the pairing of a Source A file
    Remove { source_a_path: String },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Print the effective configuration
    Show,
    /// Write the default configuration if none exists
    Init,
}

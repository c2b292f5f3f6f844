//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Interactive theorem prover library catalog, browsable by MSC classification
#[derive(Parser, Debug)]
#[command(name = "itpcat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Directory holding msc.json, libraries.csv and library_data/
    #[arg(short = 'D', long, global = true, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which libraries feed the taxonomy.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Only libraries of this prover (e.g. Isabelle)
    #[arg(short, long)]
    pub itp: Option<String>,

    /// Only this library section (e.g. AFP)
    #[arg(short, long)]
    pub section: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the classification tree with package counts
    Tree {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Reveal the classification with this code (repeatable)
        #[arg(short, long = "expand", value_name = "CODE")]
        expand: Vec<String>,

        /// Expand every classification
        #[arg(short, long)]
        all: bool,

        /// With --all: also show package details
        #[arg(long, requires = "all")]
        details: bool,
    },

    /// Browse the classification tree interactively
    Browse {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Package counts per top-level classification
    Counts {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Print the aggregated taxonomy as JSON
        #[arg(long)]
        json: bool,

        /// Skip classifications without packages
        #[arg(long)]
        non_empty: bool,
    },

    /// List the library index
    Libraries,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config (default: local config in data dir)
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Category hierarchy engine for procedure knowledge bases
#[derive(Parser, Debug)]
#[command(name = "kbtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Catalog file (overrides config `data_file`)
    #[arg(short, long, global = true, env = "KBTREE_FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Directory searched for a local .kbtree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(flatten)]
    pub viewer: ViewerArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Viewer overrides, applied on top of the configured viewer.
#[derive(Args, Debug, Default)]
pub struct ViewerArgs {
    /// Resolve as administrator (inactive and restricted categories visible)
    #[arg(long, global = true, conflicts_with = "district")]
    pub admin: bool,

    /// Resolve as a member of these districts (repeatable)
    #[arg(short = 'd', long = "district", global = true)]
    pub district: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the category forest
    Tree {
        /// Print JSON instead of a text tree
        #[arg(long)]
        json: bool,
        /// Do not list procedures under categories
        #[arg(long)]
        no_procedures: bool,
    },

    /// List active procedures anywhere under a category
    Branch {
        /// Root category id
        id: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the ancestor chain of a category
    Path {
        /// Category id
        id: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Report cycles, dangling parents and duplicate ids
    Check,

    /// Move a category under a new parent
    Move {
        /// Category to move
        id: String,
        /// New parent id
        #[arg(short, long, conflicts_with = "root")]
        parent: Option<String>,
        /// Make the category a root
        #[arg(long)]
        root: bool,
    },

    /// Create or update a category
    Upsert(UpsertArgs),

    /// Delete a category (children become roots)
    Delete {
        /// Category id
        id: String,
    },

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

#[derive(Args, Debug)]
pub struct UpsertArgs {
    /// Category id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,
    /// Display title
    #[arg(short, long)]
    pub title: String,
    /// Parent category id
    #[arg(short, long)]
    pub parent: Option<String>,
    /// Sibling ranking, higher first
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub importance: i64,
    /// Store the category as inactive
    #[arg(long)]
    pub inactive: bool,
    /// Expand by default in UIs
    #[arg(long)]
    pub open: bool,
    /// Restrict to these districts (repeatable)
    #[arg(long = "allow")]
    pub allowed_districts: Vec<String>,
    /// Icon key
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

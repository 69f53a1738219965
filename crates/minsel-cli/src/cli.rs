//! CLI argument definitions for minsel.
//!
//! Uses `clap` derive macros to define the full command surface. Each
//! command corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "minsel",
    version,
    about = "Minimal version selection over module requirement graphs",
    long_about = "Minsel computes deterministic build lists from a declared module \
                  requirement graph: for every reachable module path, the maximum \
                  version any transitive requirement demands."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the module graph file (default: find Modules.toml upward)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the build list for the root module
    List,

    /// Upgrade modules and print the resulting build list
    Upgrade {
        /// Upgrade every module to its latest version
        #[arg(long)]
        all: bool,
        /// Modules to upgrade (path@version)
        modules: Vec<String>,
    },

    /// Downgrade modules and print the resulting build list
    Downgrade {
        /// Modules to downgrade (path@version)
        #[arg(required = true)]
        modules: Vec<String>,
    },

    /// Print the smallest requirement list that reproduces the build list
    Minimize {
        /// Module paths that must appear in the output regardless
        #[arg(long)]
        base: Vec<String>,
    },

    /// Print the selected requirement graph as a tree
    Tree {
        /// Maximum depth
        #[arg(long)]
        depth: Option<usize>,
        /// Explain why a module is in the build list
        #[arg(long)]
        why: Option<String>,
        /// Show what depends on a module instead
        #[arg(long)]
        inverted: Option<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

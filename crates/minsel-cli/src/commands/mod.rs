//! Command dispatch and handler modules.

mod downgrade;
mod list;
mod minimize;
mod tree;
mod upgrade;

use std::path::Path;

use miette::Result;

use minsel_core::universe::Universe;
use minsel_core::version::ModuleVersion;
use minsel_util::errors::MinselError;

use crate::cli::{Cli, Command};

/// The graph file discovered by walking up from the working directory.
const GRAPH_FILE: &str = "Modules.toml";

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let universe = load_universe(cli.file.as_deref())?;
    match cli.command {
        Command::List => list::exec(&universe),
        Command::Upgrade { all, modules } => upgrade::exec(&universe, all, &modules),
        Command::Downgrade { modules } => downgrade::exec(&universe, &modules),
        Command::Minimize { base } => minimize::exec(&universe, &base),
        Command::Tree {
            depth,
            why,
            inverted,
        } => tree::exec(&universe, depth, why.as_deref(), inverted.as_deref()),
    }
}

fn load_universe(file: Option<&Path>) -> Result<Universe> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().map_err(MinselError::Io)?;
            let dir = minsel_util::fs::find_ancestor_with(&cwd, GRAPH_FILE).ok_or_else(|| {
                MinselError::GraphFile {
                    message: format!(
                        "could not find {GRAPH_FILE} in this directory or any parent"
                    ),
                }
            })?;
            dir.join(GRAPH_FILE)
        }
    };
    Universe::from_path(&path)
}

/// Parse a `path@version` argument.
fn parse_module_spec(s: &str) -> Result<ModuleVersion> {
    ModuleVersion::parse(s)
        .filter(|m| !m.version.is_empty())
        .ok_or_else(|| {
            MinselError::Generic {
                message: format!("invalid module spec {s:?} (expected path@version)"),
            }
            .into()
        })
}

fn parse_module_specs(specs: &[String]) -> Result<Vec<ModuleVersion>> {
    specs.iter().map(|s| parse_module_spec(s)).collect()
}

/// Print a build list, one module per line.
fn print_list(list: &[ModuleVersion]) {
    for m in list {
        println!("{m}");
    }
}

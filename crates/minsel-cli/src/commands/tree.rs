//! Handler for `minsel tree`.

use miette::Result;

use minsel_core::universe::Universe;
use minsel_resolver::graph::RequirementGraph;
use minsel_resolver::resolver;
use minsel_util::progress::status_warn;

pub fn exec(
    universe: &Universe,
    depth: Option<usize>,
    why: Option<&str>,
    inverted: Option<&str>,
) -> Result<()> {
    let list = resolver::build_list(universe.root(), universe)?;
    let graph = RequirementGraph::from_build_list(&list, universe)?;

    if let Some(key) = why {
        match graph.find_path(key) {
            Some(path) => {
                for (i, m) in path.iter().enumerate() {
                    println!("{}{m}", "  ".repeat(i));
                }
            }
            None => status_warn("Missing", &format!("{key} is not in the build list")),
        }
        return Ok(());
    }

    if let Some(key) = inverted {
        let inv = graph.print_inverted_tree(key);
        if inv.is_empty() {
            status_warn("Missing", &format!("{key} is not in the build list"));
        } else {
            print!("{inv}");
        }
        return Ok(());
    }

    print!("{}", graph.print_tree(depth));
    Ok(())
}

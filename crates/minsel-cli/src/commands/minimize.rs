//! Handler for `minsel minimize`.

use miette::Result;

use minsel_core::universe::Universe;
use minsel_resolver::resolver;
use minsel_util::progress::status;

pub fn exec(universe: &Universe, base: &[String]) -> Result<()> {
    let min = resolver::req(universe.root(), base, universe)?;
    status("Minimized", &format!("{} requirements", min.len()));
    super::print_list(&min);
    Ok(())
}

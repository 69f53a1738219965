//! Handler for `minsel downgrade`.

use miette::Result;

use minsel_core::universe::Universe;
use minsel_resolver::downgrade;
use minsel_util::progress::status;

pub fn exec(universe: &Universe, modules: &[String]) -> Result<()> {
    let targets = super::parse_module_specs(modules)?;
    let list = downgrade::downgrade(universe.root(), universe, &targets)?;
    if list.len() == 1 {
        status("Downgraded", "no requirement fits the requested versions");
    } else {
        status(
            "Downgraded",
            &format!("build list has {} modules", list.len()),
        );
    }
    super::print_list(&list);
    Ok(())
}

//! Handler for `minsel list`.

use miette::Result;

use minsel_core::universe::Universe;
use minsel_resolver::resolver;
use minsel_util::progress::status;

pub fn exec(universe: &Universe) -> Result<()> {
    let list = resolver::build_list(universe.root(), universe)?;
    status("Selected", &format!("{} modules", list.len()));
    super::print_list(&list);
    Ok(())
}

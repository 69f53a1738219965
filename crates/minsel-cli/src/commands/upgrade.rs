//! Handler for `minsel upgrade`.

use miette::Result;

use minsel_core::universe::Universe;
use minsel_resolver::resolver;
use minsel_util::errors::MinselError;
use minsel_util::progress::status;

pub fn exec(universe: &Universe, all: bool, modules: &[String]) -> Result<()> {
    let root = universe.root();
    let list = if all {
        if !modules.is_empty() {
            return Err(MinselError::Generic {
                message: "--all cannot be combined with explicit modules".to_string(),
            }
            .into());
        }
        resolver::upgrade_all(root, universe)?
    } else {
        if modules.is_empty() {
            return Err(MinselError::Generic {
                message: "nothing to upgrade: pass --all or one or more path@version modules"
                    .to_string(),
            }
            .into());
        }
        let extras = super::parse_module_specs(modules)?;
        resolver::upgrade(root, universe, &extras)?
    };
    status("Upgraded", &format!("build list has {} modules", list.len()));
    super::print_list(&list);
    Ok(())
}

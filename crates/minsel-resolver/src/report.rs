//! Diagnostic error for failed build-list construction.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use minsel_core::version::ModuleVersion;
use minsel_util::errors::MinselError;

/// Error returned when some module version in the requirement graph could
/// not be resolved.
///
/// Carries the shortest discovery path from the root to the failing module,
/// so the rendered message explains how the build reached the failure:
///
/// ```text
/// module c@1.0: required by b@2.0: updated by b@1.0: required by app: ...
/// ```
#[derive(Debug)]
pub struct BuildListError {
    err: MinselError,
    path: Vec<ModuleVersion>,
    /// Steps along `path` introduced by an upgrade rather than a
    /// requirement, keyed by the upgrading module.
    upgrades: HashMap<ModuleVersion, ModuleVersion>,
}

impl BuildListError {
    pub(crate) fn new(
        err: MinselError,
        path: Vec<ModuleVersion>,
        upgrades: HashMap<ModuleVersion, ModuleVersion>,
    ) -> Self {
        Self {
            err,
            path,
            upgrades,
        }
    }

    /// The discovery path, root first and failing module last.
    pub fn err_path(&self) -> &[ModuleVersion] {
        &self.path
    }

    /// Whether the step `from -> to` along the path was an upgrade edge.
    pub fn is_upgrade(&self, from: &ModuleVersion, to: &ModuleVersion) -> bool {
        self.upgrades.get(from) == Some(to)
    }

    /// The underlying provider failure.
    pub fn inner(&self) -> &MinselError {
        &self.err
    }
}

impl fmt::Display for BuildListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(failing) = self.path.last() else {
            return write!(f, "{}", self.err);
        };
        write!(f, "module {failing}")?;
        for step in self.path.windows(2).rev() {
            let (from, to) = (&step[0], &step[1]);
            if self.is_upgrade(from, to) {
                write!(f, ": updated by {from}")?;
            } else {
                write!(f, ": required by {from}")?;
            }
        }
        write!(f, ": {}", self.err)
    }
}

impl StdError for BuildListError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.err)
    }
}

impl miette::Diagnostic for BuildListError {}

use minsel_util::errors::MinselError;

use crate::version::ModuleVersion;

/// The requirement graph on which minimal version selection operates.
///
/// Version strings are opaque except for the special version `"none"` (see
/// [`crate::version::NONE`]). In particular, the engine does not assume
/// versions are semantic; [`Requirements::max`] gives it access to the
/// comparison operation instead.
///
/// Implementations must be safe to call from multiple threads
/// simultaneously. A provider may read the underlying graph from the
/// network on demand, so the selection algorithms parallelize the traversal
/// to overlap that latency.
pub trait Requirements: Send + Sync {
    /// The module versions explicitly required by `m` itself.
    fn required(&self, m: &ModuleVersion) -> Result<Vec<ModuleVersion>, MinselError>;

    /// The maximum of `v1` and `v2` (always one of the two).
    ///
    /// For all versions v, `max(v, "none")` must be v, and for the root
    /// passed to a selection operation, `max(root, v)` must be the root's
    /// version.
    ///
    /// Note that `v1 < v2` can be written `max(v1, v2) != v1`, and
    /// similarly `v1 <= v2` can be written `max(v1, v2) == v2`.
    fn max<'v>(&self, v1: &'v str, v2: &'v str) -> &'v str;

    /// The upgraded version of `m`, for use during an upgrade-all
    /// operation. If `m` should be kept as is, returns `m` itself.
    ///
    /// `m.version` may be `"none"` when the module is not yet used in the
    /// build; more typically it is the version required by some other
    /// module.
    fn upgrade(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError>;

    /// The version of `m.path` immediately prior to `m.version`, or the
    /// `"none"` sentinel if no earlier version is known.
    fn previous(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError>;
}

use std::fmt;

/// The sentinel version meaning "not used in the build".
///
/// This is the only version string the selection engine ever interprets;
/// everything else is opaque text ordered by the requirement provider.
pub const NONE: &str = "none";

/// One version of one module: an immutable `(path, version)` pair.
///
/// Equality is structural, and the pair is used directly as a map key
/// throughout the engine. An empty version denotes the main module, which
/// has no release of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleVersion {
    pub path: String,
    pub version: String,
}

impl ModuleVersion {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    /// The `"none"` sentinel for a path.
    pub fn none(path: impl Into<String>) -> Self {
        Self::new(path, NONE)
    }

    /// Parse `"path@version"` into a module version; a bare `"path"` has an
    /// empty version. Returns `None` for an empty path or a dangling `@`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once('@') {
            Some((path, version)) => {
                if path.is_empty() || version.is_empty() {
                    None
                } else {
                    Some(Self::new(path, version))
                }
            }
            None => {
                if s.is_empty() {
                    None
                } else {
                    Some(Self::new(s, ""))
                }
            }
        }
    }

    /// Whether this is the `"none"` sentinel for its path.
    pub fn is_none(&self) -> bool {
        self.version == NONE
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}@{}", self.path, self.version)
        }
    }
}

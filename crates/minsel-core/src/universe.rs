//! File-backed requirement provider for fully-enumerated module graphs.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use minsel_util::errors::{MinselError, MinselResult};

use crate::requirements::Requirements;
use crate::version::{ModuleVersion, NONE};

/// Raw serde form of a `Modules.toml` graph file.
#[derive(Debug, Deserialize)]
struct GraphFile {
    root: String,
    #[serde(default, rename = "module")]
    modules: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    path: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    requires: Vec<String>,
}

/// A requirement graph loaded from a TOML file, with every released module
/// version and its requirement list declared up front.
///
/// The provider's version order is byte-lexicographic, with two special
/// cases: the empty string compares above everything (so a version-less
/// root always wins its own path) and `"none"` compares below everything.
/// The selection engine never sees this ordering; it only calls
/// [`Requirements::max`].
#[derive(Debug)]
pub struct Universe {
    root: ModuleVersion,
    required: HashMap<ModuleVersion, Vec<ModuleVersion>>,
    /// Declared release versions per path, ascending.
    releases: HashMap<String, Vec<String>>,
}

impl Universe {
    /// Load and parse a graph file from the given path.
    pub fn from_path(path: &Path) -> MinselResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MinselError::GraphFile {
                message: format!("failed to read {}: {e}", path.display()),
            })?;
        Self::parse_toml(&content)
    }

    /// Parse a graph file from TOML text.
    pub fn parse_toml(content: &str) -> MinselResult<Self> {
        let file: GraphFile = toml::from_str(content).map_err(|e| MinselError::GraphFile {
            message: format!("failed to parse graph file: {e}"),
        })?;

        let root = ModuleVersion::parse(&file.root).ok_or_else(|| MinselError::GraphFile {
            message: format!("invalid root {:?} (expected path or path@version)", file.root),
        })?;

        let mut required: HashMap<ModuleVersion, Vec<ModuleVersion>> = HashMap::new();
        let mut releases: HashMap<String, Vec<String>> = HashMap::new();

        for entry in &file.modules {
            if entry.path.is_empty() {
                return Err(MinselError::GraphFile {
                    message: "module entry with an empty path".to_string(),
                }
                .into());
            }
            if entry.version == NONE {
                return Err(MinselError::GraphFile {
                    message: format!("module {} declares the reserved version \"none\"", entry.path),
                }
                .into());
            }
            let m = ModuleVersion::new(entry.path.clone(), entry.version.clone());
            if m.version.is_empty() && m != root {
                return Err(MinselError::GraphFile {
                    message: format!(
                        "module {} is missing a version (only the root may omit it)",
                        m.path
                    ),
                }
                .into());
            }

            let mut requires = Vec::with_capacity(entry.requires.len());
            for spec in &entry.requires {
                let r = ModuleVersion::parse(spec)
                    .filter(|r| !r.version.is_empty())
                    .ok_or_else(|| MinselError::GraphFile {
                        message: format!(
                            "invalid requirement {spec:?} in module {m} (expected path@version)"
                        ),
                    })?;
                requires.push(r);
            }

            if required.insert(m.clone(), requires).is_some() {
                return Err(MinselError::GraphFile {
                    message: format!("duplicate module {m}"),
                }
                .into());
            }
            if !m.version.is_empty() {
                releases.entry(m.path.clone()).or_default().push(m.version);
            }
        }

        if !required.contains_key(&root) {
            return Err(MinselError::GraphFile {
                message: format!("root {root} is not declared as a module"),
            }
            .into());
        }

        for versions in releases.values_mut() {
            versions.sort_by(|a, b| {
                if a == b {
                    std::cmp::Ordering::Equal
                } else if precedes(a, b) {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                }
            });
        }

        Ok(Self {
            root,
            required,
            releases,
        })
    }

    /// The root module of the graph.
    pub fn root(&self) -> &ModuleVersion {
        &self.root
    }
}

/// Whether `v1` orders strictly below `v2`.
fn precedes(v1: &str, v2: &str) -> bool {
    if v1 == v2 {
        false
    } else if v1 == NONE || v2.is_empty() {
        true
    } else if v2 == NONE || v1.is_empty() {
        false
    } else {
        v1 < v2
    }
}

impl Requirements for Universe {
    fn required(&self, m: &ModuleVersion) -> Result<Vec<ModuleVersion>, MinselError> {
        if m.is_none() {
            // The sentinel has no requirements of its own.
            return Ok(Vec::new());
        }
        self.required
            .get(m)
            .cloned()
            .ok_or_else(|| MinselError::Module {
                message: format!("module {m} is not declared in the graph"),
            })
    }

    fn max<'v>(&self, v1: &'v str, v2: &'v str) -> &'v str {
        if precedes(v1, v2) {
            v2
        } else {
            v1
        }
    }

    fn upgrade(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
        match self.releases.get(&m.path).and_then(|v| v.last()) {
            Some(latest) => Ok(ModuleVersion::new(m.path.clone(), latest.clone())),
            None => Ok(m.clone()),
        }
    }

    fn previous(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
        let earlier = self
            .releases
            .get(&m.path)
            .and_then(|versions| versions.iter().rev().find(|v| precedes(v, &m.version)));
        match earlier {
            Some(v) => Ok(ModuleVersion::new(m.path.clone(), v.clone())),
            None => Ok(ModuleVersion::none(m.path.clone())),
        }
    }
}

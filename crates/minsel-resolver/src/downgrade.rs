//! Constrained downgrade: lower the root's requirements until each one and
//! its transitive closure fit under per-path version caps.

use std::collections::{HashMap, HashSet};

use minsel_core::requirements::Requirements;
use minsel_core::version::ModuleVersion;
use minsel_util::errors::MinselResult;

/// Build list for `root` in which the given modules are downgraded,
/// potentially overriding the root's own requirements.
///
/// Each requirement of the root is walked backwards through
/// [`Requirements::previous`] until a version is found whose transitive
/// closure stays at or below every cap, or until the path runs out of
/// versions and is dropped entirely.
pub fn downgrade<R>(
    root: &ModuleVersion,
    reqs: &R,
    targets: &[ModuleVersion],
) -> MinselResult<Vec<ModuleVersion>>
where
    R: Requirements + ?Sized,
{
    let list = reqs.required(root)?;

    // Per-path upper bounds: the root's current requirements, lowered to
    // each downgrade target that sits below them.
    let mut cap: HashMap<String, String> = HashMap::new();
    for r in &list {
        cap.insert(r.path.clone(), r.version.clone());
    }
    for d in targets {
        let lowers = match cap.get(d.path.as_str()) {
            Some(v) => reqs.max(v, &d.version) != d.version.as_str(),
            None => true,
        };
        if lowers {
            cap.insert(d.path.clone(), d.version.clone());
        }
    }

    let mut walker = Walker {
        reqs,
        cap,
        added: HashSet::new(),
        excluded: HashSet::new(),
        rdeps: HashMap::new(),
    };

    let mut out = vec![root.clone()];
    'requirements: for r in list {
        let mut r = r;
        walker.add(&r);
        while walker.excluded.contains(&r) {
            let mut p = reqs.previous(&r)?;
            // A cap that was never a published release is invisible to
            // `previous`; splice it into the walk when the step would jump
            // straight past it.
            if let Some(v) = walker.cap.get(r.path.as_str()) {
                if reqs.max(v, &r.version) != v.as_str()
                    && reqs.max(&p.version, v) != p.version.as_str()
                {
                    p.version = v.clone();
                }
            }
            if p.is_none() {
                // No usable version left on this path; drop the
                // requirement entirely.
                continue 'requirements;
            }
            walker.add(&p);
            r = p;
        }
        out.push(r);
    }

    Ok(out)
}

/// Exclusion-propagating walk state. A version moves `added -> excluded`
/// when it sits above its cap, when its requirements cannot be loaded, or
/// when anything it requires is excluded; exclusion then cascades to every
/// recorded reverse dependency.
struct Walker<'a, R: Requirements + ?Sized> {
    reqs: &'a R,
    cap: HashMap<String, String>,
    added: HashSet<ModuleVersion>,
    excluded: HashSet<ModuleVersion>,
    rdeps: HashMap<ModuleVersion, Vec<ModuleVersion>>,
}

impl<R: Requirements + ?Sized> Walker<'_, R> {
    fn exclude(&mut self, m: &ModuleVersion) {
        if !self.excluded.insert(m.clone()) {
            return;
        }
        for parent in self.rdeps.get(m).cloned().unwrap_or_default() {
            self.exclude(&parent);
        }
    }

    fn add(&mut self, m: &ModuleVersion) {
        if !self.added.insert(m.clone()) {
            return;
        }
        let over_cap = match self.cap.get(m.path.as_str()) {
            Some(v) => self.reqs.max(&m.version, v) != v.as_str(),
            None => false,
        };
        if over_cap {
            self.exclude(m);
            return;
        }
        let list = match self.reqs.required(m) {
            Ok(list) => list,
            Err(_) => {
                // Older releases commonly carry missing or malformed
                // metadata; treat the version as unusable rather than
                // failing the whole downgrade.
                self.exclude(m);
                Vec::new()
            }
        };
        for r in &list {
            self.add(r);
            if self.excluded.contains(r) {
                self.exclude(m);
                return;
            }
            self.rdeps.entry(r.clone()).or_default().push(m.clone());
        }
    }
}

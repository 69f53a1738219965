//! Build-list construction: parallel graph exploration, the upgrade
//! variants, and the minimal requirement list.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use minsel_core::requirements::Requirements;
use minsel_core::version::ModuleVersion;
use minsel_util::errors::{MinselError, MinselResult};
use minsel_util::queue::WorkQueue;

use crate::report::BuildListError;

/// Worker parallelism for graph exploration. A provider may block on I/O
/// per vertex, so several requirement lookups are kept in flight at once.
/// Purely a latency knob; results never depend on scheduling order.
const EXPLORE_PARALLELISM: usize = 10;

/// An upgrade hook applied to every explored module version.
type UpgradeFn<'a> = &'a (dyn Fn(&ModuleVersion) -> Result<ModuleVersion, MinselError> + Sync);

/// One explored vertex of the requirement graph.
#[derive(Debug, Default)]
struct GraphNode {
    required: Vec<ModuleVersion>,
    upgrade: Option<ModuleVersion>,
    err: Option<MinselError>,
}

#[derive(Debug, Default)]
struct Exploration {
    graph: HashMap<ModuleVersion, GraphNode>,
    /// Maximum selected version per module path.
    selected: HashMap<String, String>,
    have_err: bool,
}

/// Compute the build list for `root`.
///
/// The first element of the returned list is `root` itself; the provider's
/// `max` must rank the root's version above every other version of the
/// root path, so no other version of it can be selected. The remaining
/// elements are the maximum required version of every other reachable
/// module path, sorted by path.
pub fn build_list<R>(root: &ModuleVersion, reqs: &R) -> MinselResult<Vec<ModuleVersion>>
where
    R: Requirements + ?Sized,
{
    explore(root, reqs, None)
}

/// Build list in which every module is upgraded to the provider's
/// preferred version. The root itself is never upgraded.
pub fn upgrade_all<R>(root: &ModuleVersion, reqs: &R) -> MinselResult<Vec<ModuleVersion>>
where
    R: Requirements + ?Sized,
{
    let bump = |m: &ModuleVersion| {
        if m.path == root.path {
            Ok(root.clone())
        } else {
            reqs.upgrade(m)
        }
    };
    explore(root, reqs, Some(&bump))
}

/// Build list in which the given additional modules are upgraded.
///
/// Extras whose path the root does not already require are spliced into
/// the root's requirement list as `"none"` so the upgrade hook can lift
/// them in. Duplicate extras for one path resolve to the higher version.
pub fn upgrade<R>(
    root: &ModuleVersion,
    reqs: &R,
    extras: &[ModuleVersion],
) -> MinselResult<Vec<ModuleVersion>>
where
    R: Requirements + ?Sized,
{
    let base = reqs.required(root)?;
    let path_in_list: HashSet<&str> = base.iter().map(|m| m.path.as_str()).collect();

    let mut list = base.clone();
    let mut upgrade_to: HashMap<String, String> = HashMap::new();
    for u in extras {
        if !path_in_list.contains(u.path.as_str()) {
            list.push(ModuleVersion::none(u.path.clone()));
        }
        let version = match upgrade_to.get(u.path.as_str()) {
            Some(prev) => reqs.max(prev, &u.version).to_string(),
            None => u.version.clone(),
        };
        upgrade_to.insert(u.path.clone(), version);
    }

    let override_reqs = OverrideRoot {
        root: root.clone(),
        list,
        inner: reqs,
    };
    let bump = |m: &ModuleVersion| match upgrade_to.get(m.path.as_str()) {
        Some(version) => Ok(ModuleVersion::new(m.path.clone(), version.clone())),
        None => Ok(m.clone()),
    };
    explore(root, &override_reqs, Some(&bump))
}

/// Explore the requirement graph reachable from `root` in parallel, then
/// hand the per-path maxima to the finalizer (or, if any vertex failed to
/// resolve, to the error-path reporter).
fn explore<R>(
    root: &ModuleVersion,
    reqs: &R,
    upgrade: Option<UpgradeFn<'_>>,
) -> MinselResult<Vec<ModuleVersion>>
where
    R: Requirements + ?Sized,
{
    let shared = Mutex::new(Exploration::default());

    let work = WorkQueue::new();
    work.add(root.clone());
    work.run(EXPLORE_PARALLELISM, |m: ModuleVersion| {
        if !m.is_none() {
            let mut ex = shared.lock().unwrap();
            let keep = match ex.selected.get(&m.path) {
                Some(v) => reqs.max(v, &m.version) == v.as_str(),
                None => false,
            };
            if !keep {
                ex.selected.insert(m.path.clone(), m.version.clone());
            }
        }

        // Provider calls happen outside the lock; only the worker that took
        // `m` off the queue touches this node until the final insert.
        let mut node = GraphNode::default();
        if !m.is_none() {
            match reqs.required(&m) {
                Ok(required) => {
                    for r in &required {
                        work.add(r.clone());
                    }
                    node.required = required;
                }
                Err(err) => node.err = Some(err),
            }
        }
        if node.err.is_none() {
            if let Some(bump) = upgrade {
                match bump(&m) {
                    Ok(u) => {
                        if u != m {
                            work.add(u.clone());
                            node.upgrade = Some(u);
                        }
                    }
                    Err(err) => node.err = Some(err),
                }
            }
        }

        let mut ex = shared.lock().unwrap();
        if node.err.is_some() {
            ex.have_err = true;
        }
        ex.graph.insert(m, node);
    });

    let mut ex = shared.into_inner().unwrap();
    if ex.have_err {
        if let Some(err) = error_path(root, &mut ex) {
            return Err(err.into());
        }
    }
    finalize(root, reqs, &ex)
}

/// Find the shortest path from the root to a failing vertex by BFS over the
/// completed graph, so the returned error can explain how the failure was
/// reached. Ties between simultaneous failures resolve to the first one in
/// BFS discovery order.
fn error_path(root: &ModuleVersion, ex: &mut Exploration) -> Option<BuildListError> {
    // needed_by[child] = the module through which BFS first discovered it.
    let mut needed_by: HashMap<ModuleVersion, ModuleVersion> = HashMap::new();
    let mut queue: VecDeque<ModuleVersion> = VecDeque::new();
    queue.push_back(root.clone());

    while let Some(m) = queue.pop_front() {
        let node = &ex.graph[&m];
        if node.err.is_some() {
            // Reconstruct the path from the failure back to the root, then
            // reverse it into the usual root-first order.
            let mut upgrades: HashMap<ModuleVersion, ModuleVersion> = HashMap::new();
            let mut err_path = vec![m.clone()];
            let mut child = m.clone();
            while let Some(parent) = needed_by.get(&child).cloned() {
                if ex.graph[&parent].upgrade.as_ref() == Some(&child) {
                    upgrades.insert(parent.clone(), child.clone());
                }
                err_path.push(parent.clone());
                child = parent;
            }
            err_path.reverse();

            let err = ex
                .graph
                .get_mut(&m)
                .and_then(|node| node.err.take())
                .expect("failing node vanished from the graph");
            return Some(BuildListError::new(err, err_path, upgrades));
        }

        let mut neighbors: Vec<&ModuleVersion> = node.required.iter().collect();
        if let Some(u) = &node.upgrade {
            neighbors.push(u);
        }
        for neighbor in neighbors {
            if needed_by.contains_key(neighbor) {
                continue;
            }
            needed_by.insert(neighbor.clone(), m.clone());
            queue.push_back(neighbor.clone());
        }
    }

    None
}

/// Check the two selection invariants and emit `[root, ...tail]` with the
/// tail sorted by path.
///
/// Both checks can only fail when the provider broke the documented `max`
/// contract, which is a programming defect rather than an input condition,
/// so violations abort instead of returning an error.
fn finalize<R>(
    root: &ModuleVersion,
    reqs: &R,
    ex: &Exploration,
) -> MinselResult<Vec<ModuleVersion>>
where
    R: Requirements + ?Sized,
{
    match ex.selected.get(&root.path) {
        Some(v) if *v == root.version => {}
        got => panic!("version selection chose {got:?} instead of root {root}"),
    }

    let mut list = vec![root.clone()];
    for (path, version) in &ex.selected {
        if path != &root.path {
            list.push(ModuleVersion::new(path.clone(), version.clone()));
        }

        let chosen = ModuleVersion::new(path.clone(), version.clone());
        let node = ex
            .graph
            .get(&chosen)
            .expect("selected version was never explored");
        for r in &node.required {
            if r.is_none() || r.path == root.path {
                continue;
            }
            let v = ex
                .selected
                .get(&r.path)
                .expect("required path missing from selection");
            if reqs.max(v, &r.version) != v.as_str() {
                panic!("selected version {path}@{v} does not satisfy requirement {r}");
            }
        }
    }

    list[1..].sort_by(|a, b| a.path.cmp(&b.path));
    Ok(list)
}

/// Minimal requirement list for `root`: the shortest list whose transitive
/// closure selects the same version of every path as the full build list,
/// with the constraint that every path in `base` appears regardless.
pub fn req<R>(root: &ModuleVersion, base: &[String], reqs: &R) -> MinselResult<Vec<ModuleVersion>>
where
    R: Requirements + ?Sized,
{
    let list = build_list(root, reqs)?;

    // Not parallelized: the build list above already paged in every
    // requirement list, so there is no latency left to overlap.
    let mut postorder: Vec<ModuleVersion> = Vec::new();
    let mut req_cache: HashMap<ModuleVersion, Vec<ModuleVersion>> = HashMap::new();
    req_cache.insert(root.clone(), Vec::new());
    for m in &list {
        walk_postorder(m, reqs, &mut req_cache, &mut postorder)?;
    }

    let mut max: HashMap<&str, &str> = HashMap::new();
    for m in &list {
        let version = match max.get(m.path.as_str()) {
            Some(v) => reqs.max(&m.version, v),
            None => m.version.as_str(),
        };
        max.insert(&m.path, version);
    }

    // Walk the base paths first; they are kept even when another entry
    // already implies them.
    let mut have: HashSet<ModuleVersion> = HashSet::new();
    let mut min: Vec<ModuleVersion> = Vec::new();
    for path in base {
        let version = max.get(path.as_str()).copied().unwrap_or_default();
        let m = ModuleVersion::new(path.clone(), version);
        mark_have(&m, &req_cache, &mut have);
        min.push(m);
    }

    // Now the reverse postorder to bring in anything not implied yet.
    for m in postorder.iter().rev() {
        if max.get(m.path.as_str()).copied() != Some(m.version.as_str()) {
            // An older duplicate of a path that resolved higher.
            continue;
        }
        if !have.contains(m) {
            mark_have(m, &req_cache, &mut have);
            min.push(m.clone());
        }
    }

    min.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(min)
}

fn walk_postorder<R>(
    m: &ModuleVersion,
    reqs: &R,
    cache: &mut HashMap<ModuleVersion, Vec<ModuleVersion>>,
    postorder: &mut Vec<ModuleVersion>,
) -> Result<(), MinselError>
where
    R: Requirements + ?Sized,
{
    if cache.contains_key(m) {
        return Ok(());
    }
    let required = reqs.required(m)?;
    cache.insert(m.clone(), required.clone());
    for r in &required {
        walk_postorder(r, reqs, cache, postorder)?;
    }
    postorder.push(m.clone());
    Ok(())
}

/// Mark `m` and its cached transitive requirements as already implied.
fn mark_have(
    m: &ModuleVersion,
    cache: &HashMap<ModuleVersion, Vec<ModuleVersion>>,
    have: &mut HashSet<ModuleVersion>,
) {
    if !have.insert(m.clone()) {
        return;
    }
    if let Some(required) = cache.get(m) {
        for r in required {
            mark_have(r, cache, have);
        }
    }
}

/// Wrapper provider that replaces the root's requirement list and delegates
/// everything else.
struct OverrideRoot<'a, R: Requirements + ?Sized> {
    root: ModuleVersion,
    list: Vec<ModuleVersion>,
    inner: &'a R,
}

impl<R: Requirements + ?Sized> Requirements for OverrideRoot<'_, R> {
    fn required(&self, m: &ModuleVersion) -> Result<Vec<ModuleVersion>, MinselError> {
        if *m == self.root {
            Ok(self.list.clone())
        } else {
            self.inner.required(m)
        }
    }

    fn max<'v>(&self, v1: &'v str, v2: &'v str) -> &'v str {
        self.inner.max(v1, v2)
    }

    fn upgrade(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
        self.inner.upgrade(m)
    }

    fn previous(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
        self.inner.previous(m)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use minsel_core::universe::Universe;

    use super::*;

    fn mv(s: &str) -> ModuleVersion {
        ModuleVersion::parse(s).unwrap()
    }

    fn mvs(specs: &[&str]) -> Vec<ModuleVersion> {
        specs.iter().map(|s| mv(s)).collect()
    }

    #[test]
    fn trivial_root_only() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
"#,
        )
        .unwrap();
        let list = build_list(u.root(), &u).unwrap();
        assert_eq!(list, mvs(&["app"]));
    }

    #[test]
    fn max_version_wins_across_edges() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@1", "c@1"]

[[module]]
path = "b"
version = "1"
requires = ["c@2"]

[[module]]
path = "c"
version = "1"

[[module]]
path = "c"
version = "2"
"#,
        )
        .unwrap();
        let list = build_list(u.root(), &u).unwrap();
        assert_eq!(list, mvs(&["app", "b@1", "c@2"]));
    }

    #[test]
    fn none_edges_do_not_contribute_to_selection() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@none", "c@1"]

[[module]]
path = "b"
version = "2"

[[module]]
path = "c"
version = "1"
requires = ["b@2"]
"#,
        )
        .unwrap();
        let list = build_list(u.root(), &u).unwrap();
        assert_eq!(list, mvs(&["app", "b@2", "c@1"]));
    }

    #[test]
    fn diamond_selects_maxima_and_sorts_by_path() {
        // The worked example from the MVS write-up: two requirement chains
        // meet at different versions of d, and the higher one wins.
        let u = Universe::parse_toml(
            r#"
root = "a"

[[module]]
path = "a"
requires = ["b@1.2", "c@1.2"]

[[module]]
path = "b"
version = "1.2"
requires = ["d@1.3"]

[[module]]
path = "c"
version = "1.2"
requires = ["d@1.4"]

[[module]]
path = "d"
version = "1.3"
requires = ["e@1.2"]

[[module]]
path = "d"
version = "1.4"
requires = ["e@1.2"]

[[module]]
path = "e"
version = "1.2"
"#,
        )
        .unwrap();
        // Worker interleavings vary run to run; the result must not.
        for _ in 0..5 {
            let list = build_list(u.root(), &u).unwrap();
            assert_eq!(list, mvs(&["a", "b@1.2", "c@1.2", "d@1.4", "e@1.2"]));
        }
    }

    #[test]
    fn resolution_failure_reports_shortest_path() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["a@1"]

[[module]]
path = "a"
version = "1"
requires = ["b@1"]
"#,
        )
        .unwrap();
        let err = build_list(u.root(), &u).unwrap_err();
        let bl = err
            .downcast_ref::<BuildListError>()
            .expect("expected a build-list error");
        assert_eq!(bl.err_path(), &[mv("app"), mv("a@1"), mv("b@1")]);
        assert!(!bl.is_upgrade(&mv("app"), &mv("a@1")));
        assert!(bl.inner().to_string().contains("not declared"));
        assert!(
            err.to_string().contains("required by a@1"),
            "got: {err}"
        );
    }

    #[test]
    fn upgrade_all_lifts_everything_but_the_root() {
        let u = Universe::parse_toml(
            r#"
root = "app@1"

[[module]]
path = "app"
version = "1"
requires = ["b@1"]

[[module]]
path = "app"
version = "2"

[[module]]
path = "b"
version = "1"

[[module]]
path = "b"
version = "2"
requires = ["c@1"]

[[module]]
path = "c"
version = "1"

[[module]]
path = "c"
version = "2"
"#,
        )
        .unwrap();
        let list = upgrade_all(u.root(), &u).unwrap();
        // b and c move to their latest releases; app@2 is ignored even
        // though the provider would prefer it.
        assert_eq!(list, mvs(&["app@1", "b@2", "c@2"]));
    }

    #[test]
    fn upgrade_failure_reports_updated_by_edge() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@1"]

[[module]]
path = "b"
version = "1"

[[module]]
path = "b"
version = "2"
requires = ["c@1"]
"#,
        )
        .unwrap();
        let err = upgrade_all(u.root(), &u).unwrap_err();
        let bl = err
            .downcast_ref::<BuildListError>()
            .expect("expected a build-list error");
        assert_eq!(bl.err_path(), &[mv("app"), mv("b@1"), mv("b@2"), mv("c@1")]);
        assert!(bl.is_upgrade(&mv("b@1"), &mv("b@2")));
        assert!(err.to_string().contains("updated by b@1"), "got: {err}");
    }

    #[test]
    fn targeted_upgrade_respects_requested_version() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@1", "c@1"]

[[module]]
path = "b"
version = "1"

[[module]]
path = "b"
version = "2"

[[module]]
path = "b"
version = "3"

[[module]]
path = "c"
version = "1"
"#,
        )
        .unwrap();
        // Asks for b@2 specifically, not the latest b@3.
        let list = upgrade(u.root(), &u, &mvs(&["b@2"])).unwrap();
        assert_eq!(list, mvs(&["app", "b@2", "c@1"]));
    }

    #[test]
    fn targeted_upgrade_can_introduce_new_paths() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@1"]

[[module]]
path = "b"
version = "1"

[[module]]
path = "d"
version = "1"
"#,
        )
        .unwrap();
        let list = upgrade(u.root(), &u, &mvs(&["d@1"])).unwrap();
        assert_eq!(list, mvs(&["app", "b@1", "d@1"]));
    }

    #[test]
    fn duplicate_upgrade_targets_resolve_by_max() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@1"]

[[module]]
path = "b"
version = "1"

[[module]]
path = "b"
version = "2"

[[module]]
path = "b"
version = "3"
"#,
        )
        .unwrap();
        let list = upgrade(u.root(), &u, &mvs(&["b@3", "b@2"])).unwrap();
        assert_eq!(list, mvs(&["app", "b@3"]));
    }

    #[test]
    fn req_drops_implied_requirements() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@1", "d@1"]

[[module]]
path = "b"
version = "1"
requires = ["c@2"]

[[module]]
path = "c"
version = "1"

[[module]]
path = "c"
version = "2"

[[module]]
path = "d"
version = "1"
requires = ["c@1"]
"#,
        )
        .unwrap();
        // c@2 is implied by b@1, so the minimal list omits it.
        let min = req(u.root(), &[], &u).unwrap();
        assert_eq!(min, mvs(&["b@1", "d@1"]));
    }

    #[test]
    fn req_keeps_base_paths() {
        let u = Universe::parse_toml(
            r#"
root = "app"

[[module]]
path = "app"
requires = ["b@1", "d@1"]

[[module]]
path = "b"
version = "1"
requires = ["c@2"]

[[module]]
path = "c"
version = "1"

[[module]]
path = "c"
version = "2"

[[module]]
path = "d"
version = "1"
requires = ["c@1"]
"#,
        )
        .unwrap();
        let min = req(u.root(), &["c".to_string()], &u).unwrap();
        assert_eq!(min, mvs(&["b@1", "c@2", "d@1"]));
    }

    #[test]
    fn req_of_build_list_paths_reproduces_the_build_list() {
        let u = Universe::parse_toml(
            r#"
root = "a"

[[module]]
path = "a"
requires = ["b@1.2", "c@1.2"]

[[module]]
path = "b"
version = "1.2"
requires = ["d@1.3"]

[[module]]
path = "c"
version = "1.2"
requires = ["d@1.4"]

[[module]]
path = "d"
version = "1.3"

[[module]]
path = "d"
version = "1.4"
"#,
        )
        .unwrap();
        let list = build_list(u.root(), &u).unwrap();
        let base: Vec<String> = list[1..].iter().map(|m| m.path.clone()).collect();
        let min = req(u.root(), &base, &u).unwrap();
        assert_eq!(min, list[1..].to_vec());
    }

    /// Synthetic provider with per-call latency: vertex `i` requires the
    /// next three vertices. Exercises the explorer under real concurrency.
    struct FanOut {
        count: usize,
    }

    impl FanOut {
        fn vertex(&self, i: usize) -> ModuleVersion {
            ModuleVersion::new(format!("m{i:03}"), "1")
        }
    }

    impl Requirements for FanOut {
        fn required(&self, m: &ModuleVersion) -> Result<Vec<ModuleVersion>, MinselError> {
            std::thread::sleep(Duration::from_millis(1));
            let next = if m.path == "root" {
                0
            } else {
                m.path[1..].parse::<usize>().unwrap() + 1
            };
            Ok((next..self.count.min(next + 3))
                .map(|i| self.vertex(i))
                .collect())
        }

        fn max<'v>(&self, v1: &'v str, v2: &'v str) -> &'v str {
            if v1.is_empty() || v2 == "none" || (v2 <= v1 && v1 != "none" && !v2.is_empty()) {
                v1
            } else {
                v2
            }
        }

        fn upgrade(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
            Ok(m.clone())
        }

        fn previous(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
            Ok(ModuleVersion::none(m.path.clone()))
        }
    }

    #[test]
    fn parallel_exploration_visits_every_vertex_once() {
        let reqs = FanOut { count: 60 };
        let root = ModuleVersion::new("root", "");
        let list = build_list(&root, &reqs).unwrap();
        assert_eq!(list.len(), 61);
        assert_eq!(list[0], root);
        for (i, m) in list[1..].iter().enumerate() {
            assert_eq!(m, &reqs.vertex(i));
        }
    }

    /// Provider whose `max` ignores the root exception, breaking the
    /// documented contract.
    struct BrokenMax;

    impl Requirements for BrokenMax {
        fn required(&self, m: &ModuleVersion) -> Result<Vec<ModuleVersion>, MinselError> {
            match (m.path.as_str(), m.version.as_str()) {
                ("app", "1") => Ok(vec![ModuleVersion::new("a", "1")]),
                ("a", "1") => Ok(vec![ModuleVersion::new("app", "2")]),
                _ => Ok(Vec::new()),
            }
        }

        fn max<'v>(&self, v1: &'v str, v2: &'v str) -> &'v str {
            if v1 >= v2 {
                v1
            } else {
                v2
            }
        }

        fn upgrade(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
            Ok(m.clone())
        }

        fn previous(&self, m: &ModuleVersion) -> Result<ModuleVersion, MinselError> {
            Ok(ModuleVersion::none(m.path.clone()))
        }
    }

    #[test]
    #[should_panic(expected = "instead of root")]
    fn provider_breaking_the_max_contract_aborts() {
        let root = ModuleVersion::new("app", "1");
        let _ = build_list(&root, &BrokenMax);
    }
}

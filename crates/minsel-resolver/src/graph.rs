//! Selected requirement graph construction and rendering.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use minsel_core::requirements::Requirements;
use minsel_core::version::ModuleVersion;
use minsel_util::errors::MinselResult;

/// Edge label: the version the source module asked for, which may sit below
/// the version that won selection.
#[derive(Debug, Clone)]
pub struct Requested {
    pub version: String,
}

/// The requirement graph restricted to a finished build list: one node per
/// selected module, edges following each selected module's requirement
/// list into the selected version of the required path.
pub struct RequirementGraph {
    graph: DiGraph<ModuleVersion, Requested>,
    /// Lookup from module path to its (unique) node.
    index: HashMap<String, NodeIndex>,
    root: NodeIndex,
}

impl RequirementGraph {
    /// Build the display graph for a build list. `list` must start with the
    /// root, as produced by the selection operations.
    pub fn from_build_list<R>(list: &[ModuleVersion], reqs: &R) -> MinselResult<Self>
    where
        R: Requirements + ?Sized,
    {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for m in list {
            let idx = graph.add_node(m.clone());
            index.insert(m.path.clone(), idx);
        }
        let root = index[&list[0].path];

        for m in list {
            let from = index[&m.path];
            for r in reqs.required(m)? {
                if r.is_none() {
                    continue;
                }
                let Some(&to) = index.get(&r.path) else {
                    continue;
                };
                if !graph.edges(from).any(|e| e.target() == to) {
                    graph.add_edge(from, to, Requested { version: r.version });
                }
            }
        }

        Ok(Self { graph, index, root })
    }

    /// Look up a node by module path, falling back to matching the last
    /// path segment (`example.com/lib` or just `lib`).
    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.index.get(key) {
            return Some(idx);
        }
        for (path, &idx) in &self.index {
            if path.rsplit('/').next() == Some(key) {
                return Some(idx);
            }
        }
        None
    }

    /// Number of nodes (excluding the root).
    pub fn len(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct requirements of a node, sorted by path for stable output.
    fn requirements_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &Requested)> {
        let mut deps: Vec<(NodeIndex, &Requested)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        deps.sort_by(|a, b| self.graph[a.0].path.cmp(&self.graph[b.0].path));
        deps
    }

    /// Modules that require a node, sorted by path.
    fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .collect();
        deps.sort_by(|a, b| self.graph[*a].path.cmp(&self.graph[*b].path));
        deps
    }

    /// Print the selected graph as a tree rooted at the main module. A
    /// requirement that lost to a higher version elsewhere is annotated
    /// with the version it asked for.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", self.graph[self.root]));

        let mut visited = HashSet::new();
        visited.insert(self.root);

        let deps = self.requirements_of(self.root);
        let count = deps.len();
        for (i, (idx, requested)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                &mut output,
                *idx,
                requested,
                "",
                is_last,
                1,
                max_depth,
                &mut visited,
            );
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        requested: &Requested,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        if requested.version == node.version {
            output.push_str(&format!("{prefix}{connector}{node}\n"));
        } else {
            output.push_str(&format!(
                "{prefix}{connector}{node} (requested {})\n",
                requested.version
            ));
        }

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.requirements_of(idx);
        let count = deps.len();
        for (i, (child, requested)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                requested,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find a chain of requirements from the root to a module, explaining
    /// why it is in the build list.
    pub fn find_path(&self, key: &str) -> Option<Vec<&ModuleVersion>> {
        let target = self.find(key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(self.root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.requirements_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }

    /// Print the inverted tree for one module: everything that (transitively)
    /// pulls it into the build.
    pub fn print_inverted_tree(&self, key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.find(key) else {
            return output;
        };

        output.push_str(&format!("{}\n", self.graph[idx]));

        let mut visited = HashSet::new();
        visited.insert(idx);

        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep_idx) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(&mut output, *dep_idx, "", is_last, &mut visited);
        }

        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep_idx) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(output, *dep_idx, &child_prefix, is_last, visited);
        }

        visited.remove(&idx);
    }
}

//! Module dependency graph
//!
//! Nodes live in an arena owned by [`DependencyGraph`] and refer to their
//! children by [`NodeId`], so a module required by several parents is stored
//! once and shared.
//!
//! - builder.rs: construction from a manifest, optionally expanded through a registry

mod builder;

pub use builder::DEFAULT_MAX_DEPTH;

use std::collections::{HashMap, HashSet};

/// Index of a node inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A module in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub path: String,
    /// Empty for the root module
    pub version: String,
    pub direct: bool,
    children: Vec<NodeId>,
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

fn node_key(path: &str, version: &str) -> String {
    format!("{}@{}", path, version)
}

/// Dependency graph rooted at the module being inspected
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    by_key: HashMap<String, NodeId>,
    by_path: HashMap<String, NodeId>,
    root: NodeId,
}

impl DependencyGraph {
    /// Creates a graph holding only the root module
    pub fn new(module_path: &str) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            by_key: HashMap::new(),
            by_path: HashMap::new(),
            root: NodeId(0),
        };
        graph.root = graph.get_or_create_node(module_path, "", true);
        graph
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        self.node(self.root)
    }

    /// Returns the node for an id handed out by this graph
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> {
        self.node(id)
            .children
            .iter()
            .map(|&child| (child, self.node(child)))
    }

    /// Number of distinct `path@version` nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node for `path@version`, creating it if needed.
    ///
    /// An existing node is upgraded to direct when `direct` is set, never
    /// downgraded.
    pub fn get_or_create_node(&mut self, path: &str, version: &str, direct: bool) -> NodeId {
        let key = node_key(path, version);
        if let Some(&id) = self.by_key.get(&key) {
            if direct {
                self.nodes[id.0].direct = true;
            }
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            path: path.to_string(),
            version: version.to_string(),
            direct,
            children: Vec::new(),
        });
        self.by_key.insert(key, id);
        self.by_path.insert(path.to_string(), id);
        id
    }

    /// Attaches `child` under `parent` unless a child with the same path is
    /// already there. Returns whether the child was attached.
    fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
        let child_path = &self.nodes[child.0].path;
        let exists = self.nodes[parent.0]
            .children
            .iter()
            .any(|&existing| self.nodes[existing.0].path == *child_path);
        if !exists {
            self.nodes[parent.0].children.push(child);
        }
        !exists
    }

    /// Most recently registered node for a module path, whatever its version
    pub fn find_node(&self, path: &str) -> Option<&Node> {
        self.by_path.get(path).map(|&id| self.node(id))
    }

    /// Every root-to-node path whose last module is `target`.
    ///
    /// A module reached through several parents yields one path per parent.
    /// A module path already on the current path is not entered again, at any
    /// version, which stops cycles.
    pub fn find_paths(&self, target: &str) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        let mut current = Vec::new();
        let mut on_path = HashSet::new();
        self.collect_paths(self.root, target, &mut current, &mut on_path, &mut paths);
        paths
    }

    fn collect_paths<'a>(
        &'a self,
        id: NodeId,
        target: &str,
        current: &mut Vec<String>,
        on_path: &mut HashSet<&'a str>,
        paths: &mut Vec<Vec<String>>,
    ) {
        let node = self.node(id);
        if !on_path.insert(node.path.as_str()) {
            return;
        }
        current.push(node.path.clone());

        if node.path == target {
            paths.push(current.clone());
        } else {
            for &child in &node.children {
                self.collect_paths(child, target, current, on_path, paths);
            }
        }

        current.pop();
        on_path.remove(node.path.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> DependencyGraph {
        // root -> a -> shared, root -> b -> shared
        let mut graph = DependencyGraph::new("example.com/root");
        let root = graph.root();
        let a = graph.get_or_create_node("example.com/a", "v1.0.0", true);
        let b = graph.get_or_create_node("example.com/b", "v1.0.0", true);
        let shared = graph.get_or_create_node("example.com/shared", "v1.2.0", false);
        graph.attach(root, a);
        graph.attach(root, b);
        graph.attach(a, shared);
        graph.attach(b, shared);
        graph
    }

    #[test]
    fn new_creates_direct_root_without_version() {
        let graph = DependencyGraph::new("example.com/root");

        let root = graph.root_node();
        assert_eq!(root.path, "example.com/root");
        assert_eq!(root.version, "");
        assert!(root.direct);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn get_or_create_node_returns_same_node_for_same_key() {
        let mut graph = DependencyGraph::new("root");

        let first = graph.get_or_create_node("example.com/m", "v1.0.0", false);
        let second = graph.get_or_create_node("example.com/m", "v1.0.0", false);

        assert_eq!(first, second);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn get_or_create_node_distinguishes_versions() {
        let mut graph = DependencyGraph::new("root");

        let old = graph.get_or_create_node("example.com/m", "v1.0.0", false);
        let new = graph.get_or_create_node("example.com/m", "v1.1.0", false);

        assert_ne!(old, new);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.node(old).version, "v1.0.0");
        assert_eq!(graph.find_node("example.com/m").unwrap().version, "v1.1.0");
    }

    #[test]
    fn get_or_create_node_upgrades_but_never_downgrades_direct() {
        let mut graph = DependencyGraph::new("root");

        let id = graph.get_or_create_node("example.com/m", "v1.0.0", false);
        assert!(!graph.node(id).direct);

        graph.get_or_create_node("example.com/m", "v1.0.0", true);
        assert!(graph.node(id).direct);

        graph.get_or_create_node("example.com/m", "v1.0.0", false);
        assert!(graph.node(id).direct);
    }

    #[test]
    fn attach_skips_child_with_same_path() {
        let mut graph = DependencyGraph::new("root");
        let root = graph.root();
        let v1 = graph.get_or_create_node("example.com/m", "v1.0.0", true);
        let v2 = graph.get_or_create_node("example.com/m", "v2.0.0", true);

        assert!(graph.attach(root, v1));
        assert!(!graph.attach(root, v2));
        assert_eq!(graph.root_node().children(), &[v1]);
    }

    #[test]
    fn find_node_returns_none_for_unknown_path() {
        let graph = diamond();

        assert!(graph.find_node("example.com/missing").is_none());
    }

    #[test]
    fn find_paths_reports_each_parent_of_shared_child() {
        let graph = diamond();

        let paths = graph.find_paths("example.com/shared");

        assert_eq!(
            paths,
            vec![
                vec!["example.com/root", "example.com/a", "example.com/shared"],
                vec!["example.com/root", "example.com/b", "example.com/shared"],
            ]
        );
    }

    #[test]
    fn find_paths_returns_empty_for_unreachable_module() {
        let mut graph = diamond();
        graph.get_or_create_node("example.com/orphan", "v0.1.0", false);

        assert!(graph.find_paths("example.com/orphan").is_empty());
    }

    #[test]
    fn find_paths_terminates_on_cycles() {
        let mut graph = DependencyGraph::new("root");
        let root = graph.root();
        let a = graph.get_or_create_node("a", "v1.0.0", true);
        let b = graph.get_or_create_node("b", "v1.0.0", false);
        graph.attach(root, a);
        graph.attach(a, b);
        graph.attach(b, a);

        assert_eq!(graph.find_paths("b"), vec![vec!["root", "a", "b"]]);
    }

    #[test]
    fn find_paths_does_not_pass_through_same_module_twice() {
        // root -> a@v1 -> b -> a@v2 -> target
        let mut graph = DependencyGraph::new("root");
        let root = graph.root();
        let a1 = graph.get_or_create_node("a", "v1.0.0", true);
        let b = graph.get_or_create_node("b", "v1.0.0", false);
        let a2 = graph.get_or_create_node("a", "v2.0.0", false);
        let target = graph.get_or_create_node("target", "v1.0.0", false);
        graph.attach(root, a1);
        graph.attach(a1, b);
        graph.attach(b, a2);
        graph.attach(a2, target);

        assert!(graph.find_paths("target").is_empty());
        assert_eq!(graph.find_paths("b"), vec![vec!["root", "a", "b"]]);
    }

    #[test]
    fn find_paths_to_root_is_single_element() {
        let graph = diamond();

        assert_eq!(
            graph.find_paths("example.com/root"),
            vec![vec!["example.com/root"]]
        );
    }
}

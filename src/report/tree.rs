//! ASCII rendering of a dependency graph

use std::collections::HashSet;

use crate::graph::{DependencyGraph, NodeId};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";
const REPEAT_MARKER: &str = " (*)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Levels shown below the root; `None` shows everything
    pub max_depth: Option<usize>,
    pub show_versions: bool,
    /// Print each module's subtree once and mark repeats with `(*)`
    pub prune: bool,
    /// Keep only modules whose path contains this, plus their ancestors
    pub pattern: Option<String>,
}

struct Line {
    label: String,
    children: Vec<Line>,
}

/// Renders the graph as a tree rooted at the main module.
///
/// A module that already appears among its own ancestors is printed with
/// `(*)` and not expanded, so cyclic graphs render finitely.
pub fn render_tree(graph: &DependencyGraph, options: &TreeOptions) -> String {
    let mut seen = HashSet::new();
    let mut ancestors = Vec::new();
    let mut root = collect(graph, graph.root(), 0, options, &mut seen, &mut ancestors);

    if let Some(pattern) = options.pattern.as_deref().filter(|p| !p.is_empty()) {
        root.children.retain_mut(|child| retain_matching(child, pattern));
    }

    let mut out = String::new();
    out.push_str(&root.label);
    out.push('\n');
    draw_children(&root.children, "", &mut out);
    out
}

fn collect(
    graph: &DependencyGraph,
    id: NodeId,
    depth: usize,
    options: &TreeOptions,
    seen: &mut HashSet<NodeId>,
    ancestors: &mut Vec<NodeId>,
) -> Line {
    let node = graph.node(id);
    let mut label = node.path.clone();
    if options.show_versions && !node.version.is_empty() {
        label.push('@');
        label.push_str(&node.version);
    }

    let repeated = ancestors.contains(&id) || (options.prune && seen.contains(&id));
    let has_children = !node.children().is_empty();
    if repeated {
        if has_children {
            label.push_str(REPEAT_MARKER);
        }
        return Line {
            label,
            children: Vec::new(),
        };
    }
    seen.insert(id);

    let mut children = Vec::new();
    if options.max_depth.is_none_or(|max| depth < max) {
        ancestors.push(id);
        for &child in node.children() {
            children.push(collect(graph, child, depth + 1, options, seen, ancestors));
        }
        ancestors.pop();
    }

    Line { label, children }
}

/// Drops subtrees without a match; returns whether `line` is kept
fn retain_matching(line: &mut Line, pattern: &str) -> bool {
    line.children.retain_mut(|child| retain_matching(child, pattern));
    line.label.contains(pattern) || !line.children.is_empty()
}

fn draw_children(children: &[Line], prefix: &str, out: &mut String) {
    for (index, child) in children.iter().enumerate() {
        let is_last = index + 1 == children.len();
        out.push_str(prefix);
        out.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        out.push_str(&child.label);
        out.push('\n');

        let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { PIPE });
        draw_children(&child.children, &child_prefix, out);
    }
}

/// Renders each path on its own line as `a → b → c`
pub fn render_paths(paths: &[Vec<String>]) -> String {
    paths
        .iter()
        .map(|path| format!("{}\n", path.join(" → ")))
        .collect()
}

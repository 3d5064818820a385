use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{DependencyGraph, NodeId};
use crate::parser::{GoModParser, ModFile, Parser};
use crate::version::registry::ModuleRegistry;

/// How many levels below the direct requirements are expanded
pub const DEFAULT_MAX_DEPTH: usize = 10;

impl DependencyGraph {
    /// Builds the graph described by the local manifest alone.
    ///
    /// Direct requirements become children of the root. Indirect requirements
    /// are indexed for lookup but not attached anywhere.
    pub fn build(manifest: &ModFile) -> Self {
        let mut graph = Self::new(&manifest.module_path);
        let root = graph.root();

        for req in manifest.direct_requires() {
            let child = graph.get_or_create_node(&req.path, &req.version, true);
            graph.attach(root, child);
        }

        for req in manifest.indirect_requires() {
            graph.get_or_create_node(&req.path, &req.version, false);
        }

        graph
    }

    /// Builds the graph by fetching each module's go.mod from the registry,
    /// expanding up to [`DEFAULT_MAX_DEPTH`] levels.
    pub async fn build_with_registry(
        manifest: &ModFile,
        registry: &dyn ModuleRegistry,
        cancel: &CancellationToken,
    ) -> Self {
        Self::build_with_registry_depth(manifest, registry, DEFAULT_MAX_DEPTH, cancel).await
    }

    /// Same as [`build_with_registry`](Self::build_with_registry) with an
    /// explicit depth limit.
    ///
    /// A branch whose manifest cannot be fetched or parsed simply stops
    /// growing; the rest of the graph is still built.
    pub async fn build_with_registry_depth(
        manifest: &ModFile,
        registry: &dyn ModuleRegistry,
        max_depth: usize,
        cancel: &CancellationToken,
    ) -> Self {
        let mut graph = Self::new(&manifest.module_path);
        let root = graph.root();
        let parser = GoModParser::new();

        let mut visited = Vec::new();
        let mut pending: Vec<(NodeId, usize)> = Vec::new();

        for req in manifest.direct_requires() {
            let child = graph.get_or_create_node(&req.path, &req.version, true);
            graph.attach(root, child);
            pending.push((child, 0));
            // Depth-first in declaration order: expand this branch fully
            // before the next direct requirement.
            graph
                .expand(&mut pending, &mut visited, registry, &parser, max_depth, cancel)
                .await;
        }

        graph
    }

    async fn expand(
        &mut self,
        pending: &mut Vec<(NodeId, usize)>,
        visited: &mut Vec<bool>,
        registry: &dyn ModuleRegistry,
        parser: &GoModParser,
        max_depth: usize,
        cancel: &CancellationToken,
    ) {
        while let Some((id, depth)) = pending.pop() {
            if depth >= max_depth {
                continue;
            }
            if cancel.is_cancelled() {
                debug!("Graph expansion cancelled");
                pending.clear();
                return;
            }

            if visited.len() < self.len() {
                visited.resize(self.len(), false);
            }
            if visited[id.0] {
                continue;
            }
            visited[id.0] = true;

            let (path, version) = {
                let node = self.node(id);
                (node.path.clone(), node.version.clone())
            };

            let bytes = match registry.manifest(&path, &version, cancel).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("Skipping {}@{}: {}", path, version, e);
                    continue;
                }
            };
            let child_manifest = match parser.parse_bytes(&bytes) {
                Ok(manifest) => manifest,
                Err(e) => {
                    debug!("Skipping {}@{}: invalid go.mod: {}", path, version, e);
                    continue;
                }
            };

            let mut added = Vec::new();
            for req in child_manifest.direct_requires() {
                let child = self.get_or_create_node(&req.path, &req.version, false);
                if self.attach(id, child) {
                    added.push(child);
                }
            }

            // Reversed so the first requirement is expanded first
            pending.extend(added.into_iter().rev().map(|child| (child, depth + 1)));
        }
    }
}

//! Path resolution over the project tree.
//!
//! [`PathResolver`] derives slash-delimited paths from parent links and
//! memoizes them. Resolved paths are only stable for a given tree snapshot:
//! the owner must call [`PathResolver::invalidate_all`] on any structural
//! mutation (add/remove/rename/reparent) before resolving against the new
//! tree.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::project::{FileNode, ProjectSnapshot, ROOT_ID};

/// Memoizing tree-node-id → path resolver.
///
/// A node whose parent link is absent or dangling resolves to its own name,
/// i.e. it is treated as root-relative rather than an error.
#[derive(Debug, Default)]
pub struct PathResolver {
    cache: RwLock<BTreeMap<String, String>>,
}

impl PathResolver {
    pub fn new() -> Self {
        PathResolver::default()
    }

    /// Resolves the full path of `id` within `project`. Returns an empty
    /// string for an unknown id.
    pub fn resolve(&self, id: &str, project: &ProjectSnapshot) -> String {
        if let Some(hit) = self.cache.read().get(id) {
            return hit.clone();
        }
        let Some(node) = project.get(id) else {
            return String::new();
        };
        let path = match node.parent_id.as_deref() {
            None | Some(ROOT_ID) => node.name.clone(),
            Some(parent_id) => {
                let parent_path = self.resolve(parent_id, project);
                if parent_path.is_empty() {
                    node.name.clone()
                } else {
                    format!("{parent_path}/{}", node.name)
                }
            }
        };
        self.cache.write().insert(id.to_string(), path.clone());
        path
    }

    /// Drops every memoized path. Must be invoked whenever the tree's
    /// structure changes; content-only edits do not require it.
    pub fn invalidate_all(&self) {
        self.cache.write().clear();
    }

    #[cfg(test)]
    pub(crate) fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

/// Per-compilation lookup from resolved path (and bare file name) to node.
///
/// Built once per pipeline run so reference targets can be fetched without
/// re-walking parent chains. Bare names are indexed as a fallback because
/// documents frequently reference siblings without their folder prefix.
#[derive(Debug)]
pub struct PathIndex<'a> {
    by_path: BTreeMap<String, &'a FileNode>,
}

impl<'a> PathIndex<'a> {
    pub fn build(project: &'a ProjectSnapshot, resolver: &PathResolver) -> Self {
        let mut by_path = BTreeMap::new();
        for node in project.files() {
            let path = resolver.resolve(&node.id, project);
            if path.is_empty() {
                continue;
            }
            by_path.insert(path, node);
            by_path.insert(node.name.clone(), node);
        }
        PathIndex { by_path }
    }

    pub fn get(&self, path: &str) -> Option<&'a FileNode> {
        self.by_path.get(path).copied()
    }

    /// Exact path first, then the path's final segment alone.
    pub fn get_with_basename_fallback(&self, path: &str) -> Option<&'a FileNode> {
        self.get(path)
            .or_else(|| path.rsplit('/').next().and_then(|name| self.get(name)))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }
}

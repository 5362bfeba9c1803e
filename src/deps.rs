//! Transitive dependency closure over document references.

use std::collections::{BTreeSet, VecDeque};

use crate::extract::extract_references;
use crate::paths::PathIndex;

/// Breadth-first closure of everything the entry document pulls in.
///
/// Document (`.tex`) references are expanded recursively with their content
/// fetched from the tree; image and bibliography references are terminal.
/// The `processed` set guards against circular `\input` chains — the tree
/// itself cannot cycle, but include statements can. The entry document never
/// appears in the returned set: it holds what the entry points to, not the
/// entry itself.
pub fn build_dependency_set<'a>(
    entry_content: &'a str,
    entry_path: &str,
    index: &PathIndex<'a>,
) -> BTreeSet<String> {
    let mut all_refs = BTreeSet::new();
    let mut processed = BTreeSet::from([entry_path.to_string()]);
    let mut queue: VecDeque<(&'a str, String)> =
        VecDeque::from([(entry_content, entry_path.to_string())]);

    while let Some((content, path)) = queue.pop_front() {
        for reference in extract_references(content, &path) {
            if !processed.insert(reference.clone()) {
                continue;
            }
            all_refs.insert(reference.clone());

            if reference.to_ascii_lowercase().ends_with(".tex") {
                match index.get(&reference) {
                    Some(node) if !node.content.is_empty() => {
                        queue.push_back((node.content.as_str(), reference));
                    }
                    _ => {
                        // Referenced document missing or empty: the
                        // reference stays in the set (the assembler decides
                        // what to do with it) but there is nothing to scan.
                        tracing::debug!("Dependency {reference} has no scannable content");
                    }
                }
            }
        }
    }

    all_refs.remove(entry_path);
    all_refs
}

//! Entry-point selection: pick the single document the compilation roots at.

use crate::error::VellumError;
use crate::paths::PathResolver;
use crate::project::ProjectSnapshot;

/// The selected compilation root.
#[derive(Debug, Clone, PartialEq)]
pub struct MainDocument {
    pub id: String,
    pub path: String,
    pub content: String,
}

/// Scores every `.tex` file in the tree and returns the best entry point.
///
/// Scoring: +100 for a `\documentclass` marker in the content, +50/+40/+30
/// for the reserved names `main.tex`/`thesis.tex`/`document.tex`, +10 for
/// sitting at the tree root. Ties keep the first candidate in snapshot
/// order. No `.tex` file at all is fatal for the whole pipeline.
pub fn locate_main_document(
    project: &ProjectSnapshot,
    resolver: &PathResolver,
) -> Result<MainDocument, VellumError> {
    let mut best: Option<(MainDocument, u32)> = None;

    for node in project.files() {
        if !node.is_tex() {
            continue;
        }
        let path = resolver.resolve(&node.id, project);
        if path.is_empty() {
            continue;
        }

        let mut score = 0u32;
        if node.content.contains("\\documentclass") {
            score += 100;
        }
        score += match node.name.to_ascii_lowercase().as_str() {
            "main.tex" => 50,
            "thesis.tex" => 40,
            "document.tex" => 30,
            _ => 0,
        };
        if !path.contains('/') {
            score += 10;
        }

        let better = best.as_ref().map(|(_, s)| score > *s).unwrap_or(true);
        if better {
            best = Some((
                MainDocument {
                    id: node.id.clone(),
                    path,
                    content: node.content.clone(),
                },
                score,
            ));
        }
    }

    best.map(|(doc, _)| doc)
        .ok_or(VellumError::MissingMainDocument)
}

//! Backend-agnostic resource assembly.
//!
//! Turns the tree snapshot + dependency set + synthesized indices into the
//! ordered resource list both backends consume: one main resource, N
//! supporting resources, each either text or transport-encoded binary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::extract::strip_graphics;
use crate::indices::AuxIndices;
use crate::locate::MainDocument;
use crate::paths::PathResolver;
use crate::project::ProjectSnapshot;

/// One file handed to a compilation backend.
///
/// Serializes to the remote service's wire shape:
/// `{path, main?, content?}` for text, `{path, main?, file?}` for base64
/// binary payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    #[serde(rename = "main", default, skip_serializing_if = "is_false")]
    pub is_main: bool,
    #[serde(flatten)]
    pub payload: ResourcePayload,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResourcePayload {
    /// UTF-8 document text.
    #[serde(rename = "content")]
    Text(String),
    /// Base64-encoded binary payload.
    #[serde(rename = "file")]
    Binary(String),
}

impl Resource {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Resource {
            path: path.into(),
            is_main: false,
            payload: ResourcePayload::Text(content.into()),
        }
    }

    pub fn main(path: impl Into<String>, content: impl Into<String>) -> Self {
        Resource {
            is_main: true,
            ..Resource::text(path, content)
        }
    }

    pub fn binary(path: impl Into<String>, base64_payload: impl Into<String>) -> Self {
        Resource {
            path: path.into(),
            is_main: false,
            payload: ResourcePayload::Binary(base64_payload.into()),
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.payload {
            ResourcePayload::Text(s) => Some(s),
            ResourcePayload::Binary(_) => None,
        }
    }

    pub fn binary_content(&self) -> Option<&str> {
        match &self.payload {
            ResourcePayload::Binary(s) => Some(s),
            ResourcePayload::Text(_) => None,
        }
    }
}

/// Builds the final resource list.
///
/// Inclusion rules outside draft mode: a file ships only if the dependency
/// set names it (by resolved path or bare name) or it is a style/class or
/// bibliography file — everything else is dead weight on the wire. In draft
/// mode images are dropped unconditionally and every graphics directive in
/// shipped text is rewritten to a no-op, so the engine never requests them.
/// The synthesized index files come last under the main document's basename.
/// The returned list has unique paths and exactly one main resource.
pub fn assemble_resources(
    project: &ProjectSnapshot,
    resolver: &PathResolver,
    main: &MainDocument,
    deps: &BTreeSet<String>,
    indices: &AuxIndices,
    draft_mode: bool,
) -> Vec<Resource> {
    let mut resources = Vec::new();
    let mut seen = BTreeSet::new();
    let mut skipped = 0usize;

    let main_content = if draft_mode {
        strip_graphics(&main.content)
    } else {
        main.content.clone()
    };
    seen.insert(main.path.clone());
    resources.push(Resource::main(main.path.clone(), main_content));

    for node in project.files() {
        if node.id == main.id {
            continue;
        }
        let path = resolver.resolve(&node.id, project);
        if path.is_empty() {
            continue;
        }

        let is_referenced = deps.contains(&path)
            || deps.contains(&node.name)
            || node.is_style()
            || node.is_bib();

        if !is_referenced && !draft_mode {
            skipped += 1;
            continue;
        }

        if node.is_image() {
            if draft_mode || !is_referenced {
                skipped += 1;
                continue;
            }
            if node.is_unencoded_placeholder() {
                tracing::warn!("Skipping {path}: binary content was never encoded");
                skipped += 1;
                continue;
            }
            match node.binary_payload() {
                Some(payload) if seen.insert(path.clone()) => {
                    resources.push(Resource::binary(path, payload));
                }
                Some(_) => tracing::warn!("Duplicate resource path {path} dropped"),
                None => {
                    tracing::warn!("Skipping {path}: content is not a binary data URL");
                    skipped += 1;
                }
            }
            continue;
        }

        let content = if draft_mode && node.is_tex() {
            strip_graphics(&node.content)
        } else {
            node.content.clone()
        };
        if seen.insert(path.clone()) {
            resources.push(Resource::text(path, content));
        } else {
            tracing::warn!("Duplicate resource path {path} dropped");
        }
    }

    let basename = if main.path.to_ascii_lowercase().ends_with(".tex") {
        &main.path[..main.path.len() - 4]
    } else {
        main.path.as_str()
    };
    for (ext, body) in [
        ("toc", &indices.toc),
        ("lof", &indices.lof),
        ("lot", &indices.lot),
    ] {
        let path = format!("{basename}.{ext}");
        if seen.insert(path.clone()) {
            resources.push(Resource::text(path, body.clone()));
        } else {
            tracing::warn!("Project file shadows generated {path}; keeping the project's");
        }
    }

    tracing::debug!(
        "Assembled {} resources ({} skipped as unreferenced or unshippable)",
        resources.len(),
        skipped
    );
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::build_dependency_set;
    use crate::indices::synthesize_indices;
    use crate::paths::PathIndex;
    use crate::project::{FileKind, FileNode, ROOT_ID, UNENCODED_PLACEHOLDER};

    fn file(id: &str, name: &str, content: &str) -> FileNode {
        FileNode {
            id: id.to_string(),
            name: name.to_string(),
            kind: FileKind::File,
            parent_id: Some(ROOT_ID.to_string()),
            content: content.to_string(),
        }
    }

    fn fixture() -> (ProjectSnapshot, PathResolver) {
        let mut project = ProjectSnapshot::default();
        project.insert(file(
            "m",
            "main.tex",
            "\\documentclass{book}\n\\input{chapter1}\n\\includegraphics{fig.png}",
        ));
        project.insert(file(
            "c",
            "chapter1.tex",
            "\\chapter{One}\n\\begin{figure}\n\\includegraphics{fig.png}\n\\caption{Setup}\n\\end{figure}",
        ));
        project.insert(file("f", "fig.png", "data:image/png;base64,aGVsbG8="));
        project.insert(file("s", "scratch.tex", "unreferenced notes"));
        (project, PathResolver::new())
    }

    fn assemble(draft: bool) -> Vec<Resource> {
        let (project, resolver) = fixture();
        let index = PathIndex::build(&project, &resolver);
        let main = MainDocument {
            id: "m".to_string(),
            path: "main.tex".to_string(),
            content: project.get("m").unwrap().content.clone(),
        };
        let deps = build_dependency_set(&main.content, &main.path, &index);
        let indices = synthesize_indices(&main.content, &index);
        assemble_resources(&project, &resolver, &main, &deps, &indices, draft)
    }

    #[test]
    fn full_mode_ships_referenced_files_and_indices() {
        let resources = assemble(false);
        let paths: Vec<&str> = resources.iter().map(|r| r.path.as_str()).collect();

        assert!(paths.contains(&"main.tex"));
        assert!(paths.contains(&"chapter1.tex"));
        assert!(paths.contains(&"fig.png"));
        assert!(paths.contains(&"main.toc"));
        assert!(paths.contains(&"main.lof"));
        assert!(paths.contains(&"main.lot"));
        assert!(!paths.contains(&"scratch.tex"), "unreferenced file skipped");

        let fig = resources.iter().find(|r| r.path == "fig.png").unwrap();
        assert_eq!(fig.binary_content(), Some("aGVsbG8="));

        assert_eq!(resources.iter().filter(|r| r.is_main).count(), 1);
        assert!(resources[0].is_main);
    }

    #[test]
    fn draft_mode_drops_images_and_strips_directives() {
        let resources = assemble(true);
        let paths: Vec<&str> = resources.iter().map(|r| r.path.as_str()).collect();

        assert!(!paths.contains(&"fig.png"));
        assert!(paths.contains(&"main.toc"));
        for r in &resources {
            if let Some(text) = r.text_content() {
                assert!(
                    !text.contains("\\includegraphics"),
                    "graphics directive left in {}",
                    r.path
                );
            }
        }
        // Draft mode still ships unreferenced text files.
        assert!(paths.contains(&"scratch.tex"));
    }

    #[test]
    fn style_and_bibliography_always_included() {
        let (mut project, resolver) = fixture();
        project.insert(file("cls", "thesis.cls", "\\ProvidesClass{thesis}"));
        project.insert(file("bib", "refs.bib", "@book{k, title={T}}"));

        let index = PathIndex::build(&project, &resolver);
        let main = MainDocument {
            id: "m".to_string(),
            path: "main.tex".to_string(),
            content: project.get("m").unwrap().content.clone(),
        };
        let deps = build_dependency_set(&main.content, &main.path, &index);
        let indices = AuxIndices::default();
        let resources = assemble_resources(&project, &resolver, &main, &deps, &indices, false);
        let paths: Vec<&str> = resources.iter().map(|r| r.path.as_str()).collect();

        assert!(paths.contains(&"thesis.cls"));
        assert!(paths.contains(&"refs.bib"));
    }

    #[test]
    fn unencoded_placeholder_skipped() {
        let (mut project, resolver) = fixture();
        project.insert(file("f", "fig.png", UNENCODED_PLACEHOLDER));

        let index = PathIndex::build(&project, &resolver);
        let main = MainDocument {
            id: "m".to_string(),
            path: "main.tex".to_string(),
            content: project.get("m").unwrap().content.clone(),
        };
        let deps = build_dependency_set(&main.content, &main.path, &index);
        let resources =
            assemble_resources(&project, &resolver, &main, &deps, &AuxIndices::default(), false);
        assert!(!resources.iter().any(|r| r.path == "fig.png"));
    }

    #[test]
    fn resource_paths_are_unique() {
        let resources = assemble(false);
        let mut paths: Vec<&str> = resources.iter().map(|r| r.path.as_str()).collect();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total);
    }

    #[test]
    fn wire_serialization_shape() {
        let main = Resource::main("main.tex", "\\documentclass{article}");
        let json = serde_json::to_value(&main).unwrap();
        assert_eq!(json["path"], "main.tex");
        assert_eq!(json["main"], true);
        assert_eq!(json["content"], "\\documentclass{article}");
        assert!(json.get("file").is_none());

        let img = Resource::binary("fig.png", "aGVsbG8=");
        let json = serde_json::to_value(&img).unwrap();
        assert_eq!(json["file"], "aGVsbG8=");
        assert!(json.get("content").is_none());
        assert!(json.get("main").is_none(), "main omitted when false");
    }
}

//! Project snapshot data model.
//!
//! The surrounding editor owns the file tree and mutates it; the pipeline
//! only ever reads an immutable [`ProjectSnapshot`] per invocation. The
//! snapshot is the same flat id → node shape the application persists, so it
//! round-trips through serde unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel parent id marking a node as a child of the (virtual) tree root.
pub const ROOT_ID: &str = "root";

/// Stored content marker for a binary file whose payload was never encoded.
/// Such files cannot be shipped to a backend and are skipped with a warning.
pub const UNENCODED_PLACEHOLDER: &str = "[Binary Data]";

static IMAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif|pdf)$").expect("static pattern compiles"));
static TEX_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.tex$").expect("static pattern compiles"));
static BINARY_DATA_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:(image|application)/").expect("static pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// One node of the project tree.
///
/// `content` carries text for document-kind files and a
/// `data:<mime>;base64,<payload>` URL for binary files. The tree is a forest
/// rooted at [`ROOT_ID`]: every non-root node's `parent_id` resolves to an
/// existing node, and parent links cannot cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: String,
    pub name: String,
    pub kind: FileKind,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl FileNode {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Document-kind file: a `.tex` source.
    pub fn is_tex(&self) -> bool {
        self.is_file() && TEX_FILE.is_match(&self.name)
    }

    pub fn is_image(&self) -> bool {
        self.is_file() && IMAGE_FILE.is_match(&self.name)
    }

    pub fn is_bib(&self) -> bool {
        self.is_file() && self.name.to_ascii_lowercase().ends_with(".bib")
    }

    /// Style/class support file that the engine may load implicitly.
    pub fn is_style(&self) -> bool {
        let lower = self.name.to_ascii_lowercase();
        self.is_file() && (lower.ends_with(".cls") || lower.ends_with(".sty"))
    }

    pub fn is_unencoded_placeholder(&self) -> bool {
        self.content == UNENCODED_PLACEHOLDER
    }

    /// Extracts the base64 payload from a binary data URL, if the stored
    /// content is one.
    pub fn binary_payload(&self) -> Option<&str> {
        if !BINARY_DATA_URL.is_match(&self.content) {
            return None;
        }
        self.content.split_once(',').map(|(_, payload)| payload)
    }
}

/// Immutable view of the project tree for one compilation.
///
/// A `BTreeMap` keyed by node id keeps iteration deterministic, so every
/// derived ordering (resource lists, fingerprints) is stable for a given
/// snapshot regardless of how the editor assembled it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectSnapshot {
    nodes: BTreeMap<String, FileNode>,
}

impl ProjectSnapshot {
    pub fn new(nodes: BTreeMap<String, FileNode>) -> Self {
        ProjectSnapshot { nodes }
    }

    pub fn get(&self, id: &str) -> Option<&FileNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }

    /// All file-kind nodes (folders excluded).
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values().filter(|n| n.is_file())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, node: FileNode) {
        self.nodes.insert(node.id.clone(), node);
    }
}

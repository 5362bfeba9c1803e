//! Single-pass synthesis of table-of-contents / list-of-figures /
//! list-of-tables auxiliary files.
//!
//! LaTeX normally needs a second compilation pass before `\tableofcontents`
//! renders anything: the first pass writes the `.toc`/`.lof`/`.lot` files
//! that the second one reads. This module fakes the first pass with a static
//! text scan of the entry document (recursively through includes), so one
//! backend invocation already renders populated indices. Page numbers are a
//! fixed-step heuristic, not real pagination — that approximation is the
//! accepted cost of staying single-pass.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::paths::PathIndex;

static INPUT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:input|include)\{([^}]+)\}").expect("static pattern compiles"));
static CHAPTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\chapter\{([^}]+)\}").expect("static pattern compiles"));
static SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\section\{([^}]+)\}").expect("static pattern compiles"));
static SUBSECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\subsection\{([^}]+)\}").expect("static pattern compiles"));
static CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\caption\{([^}]+)\}").expect("static pattern compiles"));

/// How many lines past `\begin{figure}`/`\begin{table}` we search for the
/// block's `\caption`.
const CAPTION_LOOKAHEAD: usize = 20;

/// Title used when a figure/table block closes without a caption.
const UNCAPTIONED: &str = "Untitled";

/// Page-counter steps per structural unit: a chapter boundary jumps further
/// than a section, roughly mimicking real pagination.
const CHAPTER_PAGE_STEP: u32 = 2;
const SECTION_PAGE_STEP: u32 = 1;
const FLOAT_PAGE_STEP: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxKind {
    Chapter,
    Section,
    Subsection,
    Figure,
    Table,
}

/// One synthesized index line before formatting.
///
/// Entries appear in document order. `number` is the hierarchical counter
/// path (`[2]`, `[2, 1]`, ...); incrementing a higher-level counter resets
/// every subordinate one.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxEntry {
    pub kind: AuxKind,
    pub number: Vec<u32>,
    pub title: String,
    pub approx_page: u32,
}

impl AuxEntry {
    fn number_string(&self) -> String {
        self.number
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Renders the `\contentsline` form the engine's index macros consume.
    fn contentsline(&self) -> String {
        let n = self.number_string();
        let page = self.approx_page;
        let title = &self.title;
        match self.kind {
            AuxKind::Chapter => format!(
                "\\contentsline {{chapter}}{{\\numberline {{{n}}}{title}}}{{{page}}}{{chapter.{n}}}"
            ),
            AuxKind::Section => format!(
                "\\contentsline {{section}}{{\\numberline {{{n}}}{title}}}{{{page}}}{{section.{n}}}"
            ),
            AuxKind::Subsection => format!(
                "\\contentsline {{subsection}}{{\\numberline {{{n}}}{title}}}{{{page}}}{{subsection.{n}}}"
            ),
            AuxKind::Figure => format!(
                "\\contentsline {{figure}}{{\\numberline {{{n}}}{{\\ignorespaces {title}}}}}{{{page}}}{{figure.{n}}}"
            ),
            AuxKind::Table => format!(
                "\\contentsline {{table}}{{\\numberline {{{n}}}{{\\ignorespaces {title}}}}}{{{page}}}{{table.{n}}}"
            ),
        }
    }
}

/// The three formatted auxiliary-file bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxIndices {
    pub toc: String,
    pub lof: String,
    pub lot: String,
}

/// Scans the entry document (inlining includes in place) and builds the
/// auxiliary index files.
pub fn synthesize_indices(entry_content: &str, index: &PathIndex) -> AuxIndices {
    let mut scanner = Scanner {
        index,
        entries: Vec::new(),
        chapter: 0,
        section: 0,
        subsection: 0,
        figure: 0,
        table: 0,
        page: 1,
        visited: BTreeSet::new(),
    };
    scanner.walk(entry_content);

    let collect = |kinds: &[AuxKind]| {
        scanner
            .entries
            .iter()
            .filter(|e| kinds.contains(&e.kind))
            .map(AuxEntry::contentsline)
            .collect::<Vec<_>>()
            .join("\n")
    };

    AuxIndices {
        toc: collect(&[AuxKind::Chapter, AuxKind::Section, AuxKind::Subsection]),
        lof: collect(&[AuxKind::Figure]),
        lot: collect(&[AuxKind::Table]),
    }
}

struct Scanner<'a, 'p> {
    index: &'a PathIndex<'p>,
    entries: Vec<AuxEntry>,
    chapter: u32,
    section: u32,
    subsection: u32,
    figure: u32,
    table: u32,
    page: u32,
    visited: BTreeSet<String>,
}

impl Scanner<'_, '_> {
    fn walk(&mut self, content: &str) {
        let lines: Vec<&str> = content.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            if line.trim_start().starts_with('%') {
                continue;
            }

            if let Some(cap) = INPUT_LINE.captures(line) {
                let mut target = cap[1].trim().to_string();
                if !target.to_ascii_lowercase().ends_with(".tex") {
                    target.push_str(".tex");
                }
                if !self.visited.insert(target.clone()) {
                    continue;
                }
                if let Some(node) = self.index.get_with_basename_fallback(&target) {
                    if !node.content.is_empty() {
                        let child = node.content.clone();
                        self.walk(&child);
                    }
                }
                continue;
            }

            if let Some(cap) = CHAPTER.captures(line) {
                self.chapter += 1;
                self.section = 0;
                self.subsection = 0;
                self.figure = 0;
                self.table = 0;
                self.page += CHAPTER_PAGE_STEP;
                self.entries.push(AuxEntry {
                    kind: AuxKind::Chapter,
                    number: vec![self.chapter],
                    title: cap[1].to_string(),
                    approx_page: self.page,
                });
                continue;
            }

            if let Some(cap) = SECTION.captures(line) {
                self.section += 1;
                self.subsection = 0;
                self.page += SECTION_PAGE_STEP;
                self.entries.push(AuxEntry {
                    kind: AuxKind::Section,
                    number: vec![self.chapter, self.section],
                    title: cap[1].to_string(),
                    approx_page: self.page,
                });
                continue;
            }

            if let Some(cap) = SUBSECTION.captures(line) {
                self.subsection += 1;
                self.entries.push(AuxEntry {
                    kind: AuxKind::Subsection,
                    number: vec![self.chapter, self.section, self.subsection],
                    title: cap[1].to_string(),
                    approx_page: self.page,
                });
                continue;
            }

            if line.contains("\\begin{figure}") {
                let title = find_caption(&lines, i, "\\end{figure}");
                self.figure += 1;
                self.page += FLOAT_PAGE_STEP;
                self.entries.push(AuxEntry {
                    kind: AuxKind::Figure,
                    number: vec![self.chapter, self.figure],
                    title,
                    approx_page: self.page,
                });
                continue;
            }

            if line.contains("\\begin{table}") {
                let title = find_caption(&lines, i, "\\end{table}");
                self.table += 1;
                self.page += FLOAT_PAGE_STEP;
                self.entries.push(AuxEntry {
                    kind: AuxKind::Table,
                    number: vec![self.chapter, self.table],
                    title,
                    approx_page: self.page,
                });
            }
        }
    }
}

/// Bounded forward scan for the block's caption; the block closing (or the
/// window running out) yields the placeholder title.
fn find_caption(lines: &[&str], start: usize, end_marker: &str) -> String {
    for line in lines
        .iter()
        .skip(start)
        .take(CAPTION_LOOKAHEAD.min(lines.len() - start))
    {
        if let Some(cap) = CAPTION.captures(line) {
            return cap[1].to_string();
        }
        if line.contains(end_marker) && !line.contains("\\begin{") {
            break;
        }
    }
    UNCAPTIONED.to_string()
}

//! Text-pattern scanning for cross-file references.
//!
//! A deliberately small stand-in for a real LaTeX parser: regex matching is
//! adequate for the common include/graphic/bibliography forms, and known to
//! be brittle against nested braces or multi-line arguments. If that ever
//! becomes a problem the replacement is a brace-depth tokenizer, not more
//! regexes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:input|include)\{([^}]+)\}").expect("static pattern compiles")
});
static GRAPHICS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\includegraphics(?:\[[^\]]*\])?\{([^}]+)\}").expect("static pattern compiles")
});
static BIBLIOGRAPHY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:bibliography|addbibresource)\{([^}]+)\}").expect("static pattern compiles")
});
static IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif|pdf)$").expect("static pattern compiles"));

/// Extensions tried for a `\includegraphics` argument given without one. The
/// assembler keeps whichever variant actually exists in the tree.
const SPECULATIVE_IMAGE_EXTS: [&str; 3] = [".png", ".jpg", ".pdf"];

/// Replacement emitted for stripped graphics directives in draft mode.
const IMAGE_SKIPPED: &str = "% [Image skipped]";

/// Blanks comment lines in place: every line whose first non-whitespace
/// character is `%` has the comment text overwritten with spaces.
///
/// Byte length and newline positions are preserved exactly, so character
/// offsets (and the line numbers derived from them downstream) remain valid
/// against the original source.
pub fn blank_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for (idx, line) in content.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let trimmed_start = line.len() - line.trim_start().len();
        if line.trim_start().starts_with('%') {
            out.push_str(&line[..trimmed_start]);
            out.extend(std::iter::repeat(' ').take(line.len() - trimmed_start));
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Scans one document's text and returns every path it references.
///
/// Include references resolve relative to the directory of the referencing
/// document (`base_path`), not the compilation root. Graphics and
/// bibliography references are returned as written; the assembler's
/// bare-name fallback covers directory-relative matches for those.
pub fn extract_references(content: &str, base_path: &str) -> BTreeSet<String> {
    let scannable = blank_comments(content);
    let mut refs = BTreeSet::new();

    for cap in INCLUDE.captures_iter(&scannable) {
        let mut target = cap[1].trim().to_string();
        if !target.to_ascii_lowercase().ends_with(".tex") {
            target.push_str(".tex");
        }
        refs.insert(resolve_sibling(&target, base_path));
    }

    for cap in GRAPHICS.captures_iter(&scannable) {
        let target = cap[1].trim();
        if IMAGE_EXT.is_match(target) {
            refs.insert(target.to_string());
        } else {
            for ext in SPECULATIVE_IMAGE_EXTS {
                refs.insert(format!("{target}{ext}"));
            }
        }
    }

    for cap in BIBLIOGRAPHY.captures_iter(&scannable) {
        let mut target = cap[1].trim().to_string();
        if !target.to_ascii_lowercase().ends_with(".bib") {
            target.push_str(".bib");
        }
        refs.insert(target);
    }

    refs
}

/// Rewrites every graphics directive into a no-op comment. Used in draft
/// mode so the engine never asks for images that were not shipped.
pub fn strip_graphics(content: &str) -> String {
    GRAPHICS.replace_all(content, IMAGE_SKIPPED).into_owned()
}

fn resolve_sibling(target: &str, base_path: &str) -> String {
    if base_path.is_empty() || target.starts_with('/') {
        return target.to_string();
    }
    match base_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{target}"),
        None => target.to_string(),
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

/// Crate-wide error taxonomy.
///
/// Every failure escaping [`crate::orchestrator::CompileOrchestrator::compile`]
/// is exactly one of these variants; compilation is all-or-nothing and no
/// partially rendered artifact is ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum VellumError {
    /// No `.tex` file suitable as a compilation root exists in the project.
    #[error("No main document found. Add a .tex file containing \\documentclass.")]
    MissingMainDocument,
    /// Transport failure reaching the remote compilation service. Retryable
    /// by the user; never retried automatically.
    #[error("Network error: {0}")]
    Network(String),
    /// The remote service compiled and the engine reported a fatal error.
    #[error("{message}{}", source_line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    RemoteCompile {
        message: String,
        source_line: Option<u32>,
    },
    /// Every engine source failed to load. Terminal for the process; the
    /// local backend will not re-attempt.
    #[error("Local engine unavailable: {0}")]
    EngineUnavailable(String),
    /// The in-process engine ran and exited with a non-zero status.
    #[error("Local compilation failed: {0}")]
    LocalCompile(String),
    /// The engine reported success but produced no output bytes.
    #[error("Compilation produced no output")]
    EmptyArtifact,
    /// A resource payload could not be prepared for transport (bad data URL,
    /// undecodable base64).
    #[error("Invalid resource: {0}")]
    InvalidResource(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl VellumError {
    /// Best-effort guidance layer: pattern-matches well-known raw engine/log
    /// substrings and appends clearer wording. Never changes the variant —
    /// callers that match on the taxonomy are unaffected.
    pub fn humanize(&self) -> String {
        let raw = self.to_string();
        let hint = if raw.contains("Network error") || raw.contains("error sending request") {
            Some("Unable to reach the compilation server. Check your connection or switch to the local engine.")
        } else if raw.contains("Undefined control sequence") {
            Some("A command name is misspelled or its package is not loaded in the preamble.")
        } else if raw.contains("not found") {
            Some("A referenced file is missing from the project. Check \\input, \\include and \\includegraphics paths.")
        } else if raw.contains("Too many }") || raw.contains("Missing { inserted") || raw.contains("Missing } inserted") {
            Some("Braces are unbalanced near the reported line.")
        } else if raw.contains("thebibliography") {
            Some("The document cites references but no bibliography environment or .bib file was produced.")
        } else if raw.contains("Runaway argument") {
            Some("A macro argument is missing its closing brace.")
        } else {
            None
        };
        match hint {
            Some(h) => format!("{raw}\n{h}"),
            None => raw,
        }
    }
}

impl From<reqwest::Error> for VellumError {
    fn from(src: reqwest::Error) -> VellumError {
        if src.is_decode() {
            VellumError::Serialization(format!("Malformed service response: {src}"))
        } else {
            // Connect, timeout, redirect and body transfer failures are all
            // transport-level from the pipeline's point of view.
            VellumError::Network(format!("{src}"))
        }
    }
}

impl From<JsonError> for VellumError {
    fn from(src: JsonError) -> VellumError {
        VellumError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for VellumError {
    fn from(src: UrlParseError) -> VellumError {
        VellumError::Serialization(format!("Invalid URL: {src}"))
    }
}

impl From<base64::DecodeError> for VellumError {
    fn from(src: base64::DecodeError) -> VellumError {
        VellumError::InvalidResource(format!("Undecodable binary payload: {src}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_compile_display_includes_line() {
        let err = VellumError::RemoteCompile {
            message: "Undefined control sequence.".to_string(),
            source_line: Some(12),
        };
        assert_eq!(format!("{err}"), "Undefined control sequence. (line 12)");

        let err = VellumError::RemoteCompile {
            message: "Undefined control sequence.".to_string(),
            source_line: None,
        };
        assert_eq!(format!("{err}"), "Undefined control sequence.");
    }

    #[test]
    fn humanize_appends_guidance_without_reclassifying() {
        let err = VellumError::RemoteCompile {
            message: "Undefined control sequence.".to_string(),
            source_line: Some(3),
        };
        let text = err.humanize();
        assert!(text.starts_with("Undefined control sequence."));
        assert!(text.contains("misspelled"));
        // The variant itself is untouched.
        assert!(matches!(err, VellumError::RemoteCompile { .. }));
    }

    #[test]
    fn humanize_passes_unknown_messages_through() {
        let err = VellumError::LocalCompile("Emergency stop.".to_string());
        assert_eq!(err.humanize(), "Local compilation failed: Emergency stop.");
    }

    #[test]
    fn humanize_network() {
        let err = VellumError::Network("connection refused".to_string());
        assert!(err.humanize().contains("compilation server"));
    }
}

//! Compilation backends.
//!
//! Two structurally different ways to turn a resource list into a PDF — a
//! remote HTTP service and an in-process engine — behind one strategy
//! trait, so the orchestrator never branches on which is in use.

mod local;
mod remote;

pub use self::local::{EngineOutput, EngineSource, EngineState, LocalEngineBackend, TexEngine};
pub use self::remote::{RemoteConfig, RemoteServiceBackend};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::VellumError;
use crate::event::ProgressSink;
use crate::resources::Resource;

/// A successfully rendered artifact (PDF bytes).
///
/// Backed by an `Arc` so cache hits clone a pointer, not megabytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Arc<[u8]>,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Artifact {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Which backend a compilation should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Synchronous HTTP submission to the compilation service.
    #[default]
    Remote,
    /// In-process engine with a virtual filesystem.
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Remote => write!(f, "remote service"),
            BackendKind::Local => write!(f, "local engine"),
        }
    }
}

/// Engine flavor sent to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TexCompiler {
    #[default]
    Pdflatex,
    Xelatex,
    Lualatex,
}

impl fmt::Display for TexCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TexCompiler::Pdflatex => write!(f, "pdflatex"),
            TexCompiler::Xelatex => write!(f, "xelatex"),
            TexCompiler::Lualatex => write!(f, "lualatex"),
        }
    }
}

/// Common backend contract: all-or-nothing compilation of an assembled
/// resource list.
#[async_trait]
pub trait CompileBackend: Send + Sync {
    /// Human-readable backend name, used for logging only.
    fn name(&self) -> &str;

    /// Compiles `resources` (exactly one of which is main) into an artifact.
    async fn compile(
        &self,
        resources: &[Resource],
        progress: &ProgressSink,
    ) -> Result<Artifact, VellumError>;
}

static FATAL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^! (.+?)\r?$").expect("static pattern compiles"));
static SOURCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^l\.(\d+)").expect("static pattern compiles"));

/// Extracts the first fatal line (`! ...`) and the first `l.<n>` source-line
/// marker from an engine log. Both backends report failures through this
/// same heuristic.
pub(crate) fn first_fatal_line(log: &str) -> Option<(String, Option<u32>)> {
    let message = FATAL_LINE.captures(log)?[1].trim().to_string();
    let source_line = SOURCE_LINE
        .captures(log)
        .and_then(|cap| cap[1].parse().ok());
    Some((message, source_line))
}

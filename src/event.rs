use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::backend::BackendKind;

/// Progress notification emitted once per pipeline stage during a
/// compilation.
///
/// Stage identities are informational (UI copy), not contractual: consumers
/// may rely only on notifications arriving in pipeline order, with either
/// [`CompileEvent::Finished`] or [`CompileEvent::Failed`] as the final one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompileEvent {
    /// Compilation accepted; `draft` reflects the requested mode.
    Started { draft: bool },
    LocatingMain,
    CheckingCache,
    /// A cached artifact satisfied the request; terminal success shortcut.
    CacheHit,
    AnalyzingDependencies,
    GeneratingIndices,
    AssemblingResources { resource_count: usize },
    Compiling { backend: BackendKind },
    /// Backend-specific detail line (engine loading, file staging, ...).
    BackendDetail(String),
    Finished { elapsed_secs: f64 },
    Failed,
}

impl Display for CompileEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CompileEvent::Started { draft: true } => write!(f, "Starting draft compilation..."),
            CompileEvent::Started { draft: false } => write!(f, "Starting full compilation..."),
            CompileEvent::LocatingMain => write!(f, "Locating main document..."),
            CompileEvent::CheckingCache => write!(f, "Checking cache..."),
            CompileEvent::CacheHit => write!(f, "Using cached PDF"),
            CompileEvent::AnalyzingDependencies => write!(f, "Analyzing dependencies..."),
            CompileEvent::GeneratingIndices => write!(f, "Generating document structure..."),
            CompileEvent::AssemblingResources { resource_count } => {
                write!(f, "Preparing {resource_count} files...")
            }
            CompileEvent::Compiling { backend } => write!(f, "Compiling ({backend})..."),
            CompileEvent::BackendDetail(msg) => write!(f, "{msg}"),
            CompileEvent::Finished { elapsed_secs } => write!(f, "Done in {elapsed_secs:.1}s"),
            CompileEvent::Failed => write!(f, "Compilation failed"),
        }
    }
}

/// Fan-out point for [`CompileEvent`]s.
///
/// Wraps an optional unbounded channel so pipeline code can report
/// unconditionally. A missing or abandoned receiver never aborts a
/// compilation: send failures are dropped.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<tokio::sync::mpsc::UnboundedSender<CompileEvent>>,
}

impl ProgressSink {
    pub fn new(tx: Option<tokio::sync::mpsc::UnboundedSender<CompileEvent>>) -> Self {
        ProgressSink { tx }
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        ProgressSink { tx: None }
    }

    pub fn send(&self, event: CompileEvent) {
        if let Some(tx) = self.tx.as_ref() {
            if tx.send(event).is_err() {
                tracing::debug!("Progress receiver dropped; continuing without notifications");
            }
        }
    }
}

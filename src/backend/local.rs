//! In-process engine backend.
//!
//! The engine itself (a TeX build exposing a virtual filesystem) is loaded
//! lazily from a prioritized list of sources — first success wins. Loading
//! is attempted at most once per process: exhausting every source parks the
//! backend in a terminal `Failed` state so later compilations fail fast
//! instead of re-fetching.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::backend::{first_fatal_line, Artifact, CompileBackend};
use crate::error::VellumError;
use crate::event::{CompileEvent, ProgressSink};
use crate::resources::{Resource, ResourcePayload};

/// Bound on each individual source's load attempt; expiry falls through to
/// the next source.
const SOURCE_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of one engine invocation.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    /// Engine exit status; non-zero means the run failed.
    pub status: i32,
    pub log: String,
    pub pdf: Vec<u8>,
}

/// Virtual-filesystem contract of a loaded engine.
#[async_trait]
pub trait TexEngine: Send {
    fn write_file(&mut self, path: &str, bytes: &[u8]);
    fn set_main_file(&mut self, path: &str);
    async fn run(&mut self) -> EngineOutput;
}

/// One place an engine implementation can be fetched from (a CDN bundle, an
/// embedded build, ...). Sources are tried in order.
#[async_trait]
pub trait EngineSource: Send + Sync {
    /// Where this source loads from, for progress/log lines.
    fn describe(&self) -> &str;

    async fn load(&self) -> Result<Box<dyn TexEngine>, VellumError>;
}

/// Loader lifecycle. `Initializing` is only observable through state labels
/// while a load is in flight; `Failed` is terminal for the process.
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready(Box<dyn TexEngine>),
    Failed(String),
}

impl EngineState {
    pub fn label(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Ready(_) => "ready",
            EngineState::Failed(_) => "failed",
        }
    }
}

/// Backend that compiles inside the process via a lazily loaded engine.
pub struct LocalEngineBackend {
    sources: Vec<Box<dyn EngineSource>>,
    state: Mutex<EngineState>,
}

impl LocalEngineBackend {
    pub fn new(sources: Vec<Box<dyn EngineSource>>) -> Self {
        LocalEngineBackend {
            sources,
            state: Mutex::new(EngineState::Uninitialized),
        }
    }

    pub async fn state_label(&self) -> &'static str {
        self.state.lock().await.label()
    }

    /// Drives the state machine to `Ready`, loading the engine if this is
    /// the first call. Re-entering `Ready` is a no-op; `Failed` is terminal
    /// and fails fast without touching the sources again.
    async fn ensure_ready(
        &self,
        state: &mut EngineState,
        progress: &ProgressSink,
    ) -> Result<(), VellumError> {
        match state {
            EngineState::Ready(_) => return Ok(()),
            EngineState::Failed(msg) => return Err(VellumError::EngineUnavailable(msg.clone())),
            EngineState::Uninitialized | EngineState::Initializing => {}
        }

        *state = EngineState::Initializing;
        progress.send(CompileEvent::BackendDetail(
            "Initializing local engine...".to_string(),
        ));

        let mut last_error = String::from("no engine sources configured");
        for source in &self.sources {
            progress.send(CompileEvent::BackendDetail(format!(
                "Trying to load engine from {}...",
                source.describe()
            )));
            match tokio::time::timeout(SOURCE_TIMEOUT, source.load()).await {
                Ok(Ok(engine)) => {
                    progress.send(CompileEvent::BackendDetail(
                        "Local engine ready".to_string(),
                    ));
                    *state = EngineState::Ready(engine);
                    return Ok(());
                }
                Ok(Err(e)) => {
                    tracing::warn!("Engine source {} failed: {e}", source.describe());
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(
                        "Engine source {} timed out after {SOURCE_TIMEOUT:?}",
                        source.describe()
                    );
                    last_error = format!("{} timed out", source.describe());
                }
            }
        }

        let msg = format!(
            "all {} engine sources failed (last: {last_error}). \
             Switch to the remote compilation backend.",
            self.sources.len()
        );
        *state = EngineState::Failed(msg.clone());
        Err(VellumError::EngineUnavailable(msg))
    }
}

#[async_trait]
impl CompileBackend for LocalEngineBackend {
    fn name(&self) -> &str {
        "local-engine"
    }

    async fn compile(
        &self,
        resources: &[Resource],
        progress: &ProgressSink,
    ) -> Result<Artifact, VellumError> {
        let mut state = self.state.lock().await;
        self.ensure_ready(&mut state, progress).await?;
        let EngineState::Ready(engine) = &mut *state else {
            unreachable!("ensure_ready returned Ok with a non-ready state");
        };

        let main_path = resources
            .iter()
            .find(|r| r.is_main)
            .map(|r| r.path.clone())
            .ok_or_else(|| {
                VellumError::InvalidResource("no main resource designated".to_string())
            })?;

        progress.send(CompileEvent::BackendDetail(
            "Writing files to virtual filesystem...".to_string(),
        ));
        for resource in resources {
            match &resource.payload {
                ResourcePayload::Text(text) => engine.write_file(&resource.path, text.as_bytes()),
                ResourcePayload::Binary(encoded) => {
                    let bytes = BASE64.decode(encoded)?;
                    engine.write_file(&resource.path, &bytes);
                }
            }
        }
        engine.set_main_file(&main_path);

        progress.send(CompileEvent::BackendDetail(
            "Compiling with local engine...".to_string(),
        ));
        let output = engine.run().await;

        if output.status != 0 {
            let message = match first_fatal_line(&output.log) {
                Some((message, Some(line))) => format!("{message} (line {line})"),
                Some((message, None)) => message,
                None => format!("engine exited with status {}", output.status),
            };
            return Err(VellumError::LocalCompile(message));
        }
        if output.pdf.is_empty() {
            return Err(VellumError::EmptyArtifact);
        }
        Ok(Artifact::new(output.pdf))
    }
}

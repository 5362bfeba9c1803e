//! Shared fixtures for pipeline testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::backend::{
    Artifact, CompileBackend, EngineOutput, EngineSource, TexEngine,
};
use crate::error::VellumError;
use crate::event::ProgressSink;
use crate::project::{FileKind, FileNode, ProjectSnapshot, ROOT_ID};
use crate::resources::Resource;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn file(id: &str, name: &str, parent: &str, content: &str) -> FileNode {
    FileNode {
        id: id.to_string(),
        name: name.to_string(),
        kind: FileKind::File,
        parent_id: Some(parent.to_string()),
        content: content.to_string(),
    }
}

pub fn folder(id: &str, name: &str) -> FileNode {
    FileNode {
        id: id.to_string(),
        name: name.to_string(),
        kind: FileKind::Folder,
        parent_id: Some(ROOT_ID.to_string()),
        content: String::new(),
    }
}

pub fn project_of(nodes: Vec<FileNode>) -> ProjectSnapshot {
    let mut project = ProjectSnapshot::default();
    for node in nodes {
        project.insert(node);
    }
    project
}

/// Backend double that records the resource list it was handed and returns a
/// plausibly sized artifact.
pub struct RecordingBackend {
    pub captured: Mutex<Vec<Vec<Resource>>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingBackend {
            captured: Mutex::new(Vec::new()),
        })
    }

    pub fn last_resources(&self) -> Vec<Resource> {
        self.captured.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompileBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn compile(
        &self,
        resources: &[Resource],
        _progress: &ProgressSink,
    ) -> Result<Artifact, VellumError> {
        self.captured.lock().push(resources.to_vec());
        Ok(Artifact::new(vec![b'%'; 4096]))
    }
}

/// What a [`RecordingEngine`] observed through the virtual filesystem API.
#[derive(Debug, Default)]
pub struct EngineObservations {
    pub files: Vec<(String, Vec<u8>)>,
    pub main: Option<String>,
}

struct RecordingEngine {
    observations: Arc<Mutex<EngineObservations>>,
    output: EngineOutput,
}

#[async_trait]
impl TexEngine for RecordingEngine {
    fn write_file(&mut self, path: &str, bytes: &[u8]) {
        self.observations
            .lock()
            .files
            .push((path.to_string(), bytes.to_vec()));
    }

    fn set_main_file(&mut self, path: &str) {
        self.observations.lock().main = Some(path.to_string());
    }

    async fn run(&mut self) -> EngineOutput {
        self.output.clone()
    }
}

/// Engine source yielding a [`RecordingEngine`] whose observations stay
/// visible to the test through the shared handle.
pub struct RecordingEngineSource {
    pub observations: Arc<Mutex<EngineObservations>>,
    pub output: EngineOutput,
}

impl RecordingEngineSource {
    pub fn succeeding() -> (Box<dyn EngineSource>, Arc<Mutex<EngineObservations>>) {
        let observations = Arc::new(Mutex::new(EngineObservations::default()));
        let source = RecordingEngineSource {
            observations: observations.clone(),
            output: EngineOutput {
                status: 0,
                log: "Output written on main.pdf".to_string(),
                pdf: vec![b'%'; 2048],
            },
        };
        (Box::new(source), observations)
    }
}

#[async_trait]
impl EngineSource for RecordingEngineSource {
    fn describe(&self) -> &str {
        "test://recording-engine"
    }

    async fn load(&self) -> Result<Box<dyn TexEngine>, VellumError> {
        Ok(Box::new(RecordingEngine {
            observations: self.observations.clone(),
            output: self.output.clone(),
        }))
    }
}

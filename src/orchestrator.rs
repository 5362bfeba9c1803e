//! Public entry point: sequences the whole pipeline and owns its state.
//!
//! Every cache the pipeline uses (path memoization, compiled artifacts, the
//! local engine's init state) lives on this struct or its injected backends
//! — there are no module-level globals, so independent orchestrators (and
//! tests) never share hidden state.

use std::sync::Arc;
use std::time::Instant;

use crate::backend::{Artifact, BackendKind, CompileBackend};
use crate::cache::{CompilationCache, Fingerprint};
use crate::deps::build_dependency_set;
use crate::error::VellumError;
use crate::event::{CompileEvent, ProgressSink};
use crate::indices::synthesize_indices;
use crate::locate::locate_main_document;
use crate::paths::{PathIndex, PathResolver};
use crate::project::ProjectSnapshot;
use crate::resources::assemble_resources;

/// Per-compilation options supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Strip images for faster iteration. Draft results are never cached.
    pub draft_mode: bool,
    /// Bypass the artifact cache for this run only.
    pub skip_cache: bool,
    pub backend: BackendKind,
}

/// Sequences locate → cache check → dependency closure → index synthesis →
/// resource assembly → backend dispatch → cache store, reporting progress at
/// each stage and normalizing every failure into one [`VellumError`].
pub struct CompileOrchestrator {
    resolver: PathResolver,
    cache: CompilationCache,
    remote: Arc<dyn CompileBackend>,
    local: Arc<dyn CompileBackend>,
    progress: ProgressSink,
}

impl CompileOrchestrator {
    pub fn new(
        remote: Arc<dyn CompileBackend>,
        local: Arc<dyn CompileBackend>,
        progress_tx: Option<tokio::sync::mpsc::UnboundedSender<CompileEvent>>,
    ) -> Self {
        CompileOrchestrator {
            resolver: PathResolver::new(),
            cache: CompilationCache::default(),
            remote,
            local,
            progress: ProgressSink::new(progress_tx),
        }
    }

    /// Compiles a snapshot of the project tree into a PDF artifact.
    ///
    /// All-or-nothing: on failure exactly one classified error is returned
    /// and no partial artifact exists. The final progress notification
    /// (`Finished` or `Failed`) always precedes this method resolving.
    pub async fn compile(
        &self,
        project: &ProjectSnapshot,
        options: &CompileOptions,
    ) -> Result<Artifact, VellumError> {
        let started = Instant::now();
        self.progress.send(CompileEvent::Started {
            draft: options.draft_mode,
        });

        let result = self.run_pipeline(project, options).await;
        match &result {
            Ok(_) => self.progress.send(CompileEvent::Finished {
                elapsed_secs: started.elapsed().as_secs_f64(),
            }),
            Err(e) => {
                tracing::warn!("Compilation failed: {e}");
                self.progress.send(CompileEvent::Failed);
            }
        }
        result
    }

    async fn run_pipeline(
        &self,
        project: &ProjectSnapshot,
        options: &CompileOptions,
    ) -> Result<Artifact, VellumError> {
        self.progress.send(CompileEvent::LocatingMain);
        let main = locate_main_document(project, &self.resolver)?;

        let use_cache = !options.draft_mode && !options.skip_cache;
        let fingerprint = if use_cache {
            self.progress.send(CompileEvent::CheckingCache);
            let fp = Fingerprint::of_project(project, &self.resolver);
            if let Some(hit) = self.cache.get(&fp) {
                self.progress.send(CompileEvent::CacheHit);
                return Ok(hit);
            }
            Some(fp)
        } else {
            None
        };

        self.progress.send(CompileEvent::AnalyzingDependencies);
        let index = PathIndex::build(project, &self.resolver);
        let deps = build_dependency_set(&main.content, &main.path, &index);

        self.progress.send(CompileEvent::GeneratingIndices);
        let indices = synthesize_indices(&main.content, &index);

        let resources = assemble_resources(
            project,
            &self.resolver,
            &main,
            &deps,
            &indices,
            options.draft_mode,
        );
        self.progress.send(CompileEvent::AssemblingResources {
            resource_count: resources.len(),
        });

        self.progress.send(CompileEvent::Compiling {
            backend: options.backend,
        });
        let backend = match options.backend {
            BackendKind::Remote => &self.remote,
            BackendKind::Local => &self.local,
        };
        let artifact = backend.compile(&resources, &self.progress).await?;

        if let Some(fp) = fingerprint {
            self.cache.put(fp, artifact.clone());
        }
        Ok(artifact)
    }

    /// Forget every memoized node path. Call on any structural tree change.
    pub fn clear_path_cache(&self) {
        self.resolver.invalidate_all();
    }

    /// Drop every cached artifact. Call on any structural tree change so a
    /// stale artifact can never reference since-deleted resources.
    pub fn clear_compilation_cache(&self) {
        self.cache.clear();
    }

    /// Convenience for the surrounding application's mutation hook: clears
    /// both caches. Content-only edits are already covered by the
    /// fingerprint changing, but clearing on every mutation is the cheaper
    /// policy to reason about.
    pub fn on_tree_mutated(&self) {
        self.clear_path_cache();
        self.clear_compilation_cache();
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &CompilationCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{FileKind, FileNode, ROOT_ID};
    use crate::resources::Resource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
        result: Result<Vec<u8>, VellumError>,
    }

    impl CountingBackend {
        fn ok() -> Arc<Self> {
            Arc::new(CountingBackend {
                calls: AtomicUsize::new(0),
                result: Ok(vec![b'%'; 4096]),
            })
        }

        fn failing(err: VellumError) -> Arc<Self> {
            Arc::new(CountingBackend {
                calls: AtomicUsize::new(0),
                result: Err(err),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompileBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        async fn compile(
            &self,
            _resources: &[Resource],
            _progress: &ProgressSink,
        ) -> Result<Artifact, VellumError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(Artifact::new)
        }
    }

    fn sample_project() -> ProjectSnapshot {
        let mut project = ProjectSnapshot::default();
        project.insert(FileNode {
            id: "m".to_string(),
            name: "main.tex".to_string(),
            kind: FileKind::File,
            parent_id: Some(ROOT_ID.to_string()),
            content: "\\documentclass{article}\n\\section{One}".to_string(),
        });
        project
    }

    #[tokio::test]
    async fn empty_tree_fails_with_missing_main() {
        let orchestrator =
            CompileOrchestrator::new(CountingBackend::ok(), CountingBackend::ok(), None);
        let err = orchestrator
            .compile(&ProjectSnapshot::default(), &CompileOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, VellumError::MissingMainDocument);
    }

    #[tokio::test]
    async fn second_compile_served_from_cache() {
        let remote = CountingBackend::ok();
        let orchestrator = CompileOrchestrator::new(remote.clone(), CountingBackend::ok(), None);
        let project = sample_project();

        orchestrator
            .compile(&project, &CompileOptions::default())
            .await
            .unwrap();
        orchestrator
            .compile(&project, &CompileOptions::default())
            .await
            .unwrap();
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn skip_cache_forces_recompilation() {
        let remote = CountingBackend::ok();
        let orchestrator = CompileOrchestrator::new(remote.clone(), CountingBackend::ok(), None);
        let project = sample_project();
        let options = CompileOptions {
            skip_cache: true,
            ..CompileOptions::default()
        };

        orchestrator.compile(&project, &options).await.unwrap();
        orchestrator.compile(&project, &options).await.unwrap();
        assert_eq!(remote.calls(), 2);
        assert!(orchestrator.cache().is_empty(), "skip_cache never stores");
    }

    #[tokio::test]
    async fn draft_results_are_not_cached() {
        let remote = CountingBackend::ok();
        let orchestrator = CompileOrchestrator::new(remote.clone(), CountingBackend::ok(), None);
        let project = sample_project();
        let options = CompileOptions {
            draft_mode: true,
            ..CompileOptions::default()
        };

        orchestrator.compile(&project, &options).await.unwrap();
        orchestrator.compile(&project, &options).await.unwrap();
        assert_eq!(remote.calls(), 2);
        assert!(orchestrator.cache().is_empty());
    }

    #[tokio::test]
    async fn backend_selection_routes_to_local() {
        let remote = CountingBackend::ok();
        let local = CountingBackend::ok();
        let orchestrator = CompileOrchestrator::new(remote.clone(), local.clone(), None);
        let options = CompileOptions {
            backend: BackendKind::Local,
            ..CompileOptions::default()
        };

        orchestrator
            .compile(&sample_project(), &options)
            .await
            .unwrap();
        assert_eq!(remote.calls(), 0);
        assert_eq!(local.calls(), 1);
    }

    #[tokio::test]
    async fn tree_mutation_invalidates_cached_artifacts() {
        let remote = CountingBackend::ok();
        let orchestrator = CompileOrchestrator::new(remote.clone(), CountingBackend::ok(), None);
        let project = sample_project();

        orchestrator
            .compile(&project, &CompileOptions::default())
            .await
            .unwrap();
        orchestrator.on_tree_mutated();
        orchestrator
            .compile(&project, &CompileOptions::default())
            .await
            .unwrap();
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn progress_ends_with_failed_on_backend_error() {
        let remote = CountingBackend::failing(VellumError::Network("down".to_string()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let orchestrator = CompileOrchestrator::new(remote, CountingBackend::ok(), Some(tx));

        let err = orchestrator
            .compile(&sample_project(), &CompileOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, VellumError::Network("down".to_string()));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&CompileEvent::Started { draft: false }));
        assert_eq!(events.last(), Some(&CompileEvent::Failed));
    }

    #[tokio::test]
    async fn progress_ends_with_finished_on_success() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let orchestrator =
            CompileOrchestrator::new(CountingBackend::ok(), CountingBackend::ok(), Some(tx));

        orchestrator
            .compile(&sample_project(), &CompileOptions::default())
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(
            events.last(),
            Some(CompileEvent::Finished { .. })
        ));
        // Stage notifications arrive in pipeline order.
        let locate_pos = events
            .iter()
            .position(|e| *e == CompileEvent::LocatingMain)
            .unwrap();
        let compile_pos = events
            .iter()
            .position(|e| matches!(e, CompileEvent::Compiling { .. }))
            .unwrap();
        assert!(locate_pos < compile_pos);
    }
}

//! # vellum-core
//!
//! The compilation pipeline behind a multi-file LaTeX editing application:
//! given a snapshot of a project file tree, produce a rendered PDF through
//! one of two interchangeable backends.
//!
//! ## Overview
//!
//! The hard part of compiling a LaTeX project is not invoking an engine —
//! it is everything before that: finding the entry document in an arbitrary
//! tree, computing the minimal transitive set of files it actually needs,
//! pre-building the auxiliary index files (`.toc`/`.lof`/`.lot`) so a single
//! pass already renders a populated table of contents, packaging the result
//! into a backend-agnostic resource list, and caching artifacts by content
//! fingerprint so repeat compilations are free.
//!
//! ### Key features
//!
//! - **Entry-point scoring**: picks the main document by `\documentclass`
//!   marker, reserved filenames, and tree position ([`locate`])
//! - **Dependency closure**: breadth-first expansion of `\input` /
//!   `\include` / `\includegraphics` / bibliography references, robust
//!   against circular includes ([`deps`], [`extract`])
//! - **Single-pass indices**: synthesized `.toc`/`.lof`/`.lot` files with
//!   hierarchical numbering and approximate page counters ([`indices`])
//! - **Draft mode**: images dropped and graphics directives rewritten for
//!   fast iteration ([`resources`])
//! - **Pluggable backends**: remote HTTP service or in-process engine with
//!   lazy multi-source loading, behind one strategy trait ([`backend`])
//! - **Fingerprint cache**: XXH3 content hash → artifact, with TTL eviction
//!   ([`cache`])
//! - **Classified errors**: one crate-wide taxonomy with a best-effort
//!   message-humanization layer ([`error`])
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vellum_core::backend::{LocalEngineBackend, RemoteServiceBackend};
//! use vellum_core::orchestrator::{CompileOptions, CompileOrchestrator};
//! use vellum_core::project::{FileKind, FileNode, ProjectSnapshot, ROOT_ID};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut project = ProjectSnapshot::default();
//!     project.insert(FileNode {
//!         id: "1".to_string(),
//!         name: "main.tex".to_string(),
//!         kind: FileKind::File,
//!         parent_id: Some(ROOT_ID.to_string()),
//!         content: "\\documentclass{article}\n\\begin{document}Hello\\end{document}"
//!             .to_string(),
//!     });
//!
//!     let remote = Arc::new(RemoteServiceBackend::with_defaults()?);
//!     // Engine sources (e.g. a WASM TeX build) are supplied by the
//!     // embedding application; with none, the local backend reports
//!     // EngineUnavailable and the remote backend does the work.
//!     let local = Arc::new(LocalEngineBackend::new(Vec::new()));
//!     let orchestrator = CompileOrchestrator::new(remote, local, None);
//!
//!     let pdf = orchestrator
//!         .compile(&project, &CompileOptions::default())
//!         .await?;
//!     println!("rendered {} bytes", pdf.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Ownership and invalidation
//!
//! The surrounding editor owns and mutates the file tree; this crate only
//! reads an immutable [`project::ProjectSnapshot`] per invocation. The
//! orchestrator owns the path and artifact caches — call
//! [`orchestrator::CompileOrchestrator::on_tree_mutated`] from the editor's
//! mutation hook and staleness cannot occur. One compilation should run to
//! completion before the next starts against the same orchestrator; the
//! crate does not serialize overlapping calls itself.
//!
//! ## Module guide
//!
//! Start with [`orchestrator::CompileOrchestrator`], then [`backend`] for
//! the two compilation strategies. [`project`] holds the tree model the
//! editor hands over.

pub mod backend;
pub mod cache;
pub mod deps;
pub mod error;
pub mod event;
pub mod extract;
pub mod indices;
pub mod locate;
pub mod orchestrator;
pub mod paths;
pub mod project;
pub mod resources;
#[cfg(test)]
mod tests;

pub use error::*;

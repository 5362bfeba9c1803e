//! Compilation result cache keyed by content fingerprint.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::backend::Artifact;
use crate::paths::PathResolver;
use crate::project::ProjectSnapshot;

/// Entries older than this are misses on read.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// 128-bit XXH3 content fingerprint of a project snapshot.
///
/// Computed over every non-image file's path and content, sorted by resolved
/// path — stable however the snapshot map happens to iterate. Image content
/// is deliberately excluded: image-only edits do not invalidate the cache,
/// and structural changes (add/delete) are covered by the owner calling
/// [`CompilationCache::clear`] instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Fingerprint(hash.to_le_bytes())
    }

    pub fn of_project(project: &ProjectSnapshot, resolver: &PathResolver) -> Self {
        let mut entries: Vec<(String, &str)> = project
            .files()
            .filter(|node| !node.is_image())
            .map(|node| (resolver.resolve(&node.id, project), node.content.as_str()))
            .collect();
        entries.sort();

        let mut buf = Vec::new();
        for (path, content) in entries {
            buf.extend_from_slice(path.as_bytes());
            buf.push(0);
            buf.extend_from_slice(content.as_bytes());
            buf.push(0);
        }
        Fingerprint::from_bytes(&buf)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    artifact: Artifact,
    created_at: Instant,
}

/// Fingerprint → artifact map with time-based eviction on read.
///
/// No background sweep: an expired entry simply reads as a miss and is
/// overwritten by the next `put` for its fingerprint. The owner must call
/// [`CompilationCache::clear`] on any structural tree change so deleted
/// resources can never be served from a stale artifact.
#[derive(Debug)]
pub struct CompilationCache {
    ttl: Duration,
    entries: RwLock<BTreeMap<Fingerprint, CacheEntry>>,
}

impl Default for CompilationCache {
    fn default() -> Self {
        CompilationCache::new(DEFAULT_TTL)
    }
}

impl CompilationCache {
    pub fn new(ttl: Duration) -> Self {
        CompilationCache {
            ttl,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Artifact> {
        self.get_at(fingerprint, Instant::now())
    }

    /// TTL check against an injected clock; `get` supplies the real one.
    pub fn get_at(&self, fingerprint: &Fingerprint, now: Instant) -> Option<Artifact> {
        let entries = self.entries.read();
        let entry = entries.get(fingerprint)?;
        if now.saturating_duration_since(entry.created_at) < self.ttl {
            Some(entry.artifact.clone())
        } else {
            None
        }
    }

    /// Later writes overwrite: one entry per fingerprint.
    pub fn put(&self, fingerprint: Fingerprint, artifact: Artifact) {
        self.entries.write().insert(
            fingerprint,
            CacheEntry {
                artifact,
                created_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

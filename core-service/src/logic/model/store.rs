//! Model Store - on-disk artifact with a short-lived in-memory cache
//!
//! The artifact is re-read only when its file identity (path, mtime, size)
//! changes, and the file is stat'ed at most once per TTL. Concurrent callers
//! may observe a model that is a few seconds stale.
//!
//! A missing or undecodable file is the "no model" state, not an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::artifact::ModelArtifact;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// What the cache is keyed on
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArtifactIdentity {
    modified: Option<SystemTime>,
    len: u64,
}

/// A loaded model plus provenance
#[derive(Debug, Clone)]
struct LoadedModel {
    artifact: Arc<ModelArtifact>,
    checksum: String,
    loaded_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CacheEntry {
    /// `None` when the file is absent
    identity: Option<ArtifactIdentity>,
    /// `None` when absent or undecodable
    model: Option<LoadedModel>,
    checked_at: Instant,
}

/// Model status for the API
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub path: String,
    pub algo: Option<String>,
    pub cols: Vec<String>,
    pub checksum: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

// ============================================================================
// STORE
// ============================================================================

/// Process-wide model cache. The scoring path only ever reads from it.
pub struct ModelStore {
    path: PathBuf,
    ttl: Duration,
    cache: RwLock<Option<CacheEntry>>,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current model, reloading from disk if the cache is stale and the
    /// file changed. `None` means "no model".
    pub fn load(&self) -> Option<Arc<ModelArtifact>> {
        {
            let cache = self.cache.read();
            if let Some(entry) = cache.as_ref() {
                if entry.checked_at.elapsed() < self.ttl {
                    return entry.model.as_ref().map(|m| m.artifact.clone());
                }
            }
        }

        let mut cache = self.cache.write();

        // Another caller may have refreshed while we waited for the lock
        if let Some(entry) = cache.as_ref() {
            if entry.checked_at.elapsed() < self.ttl {
                return entry.model.as_ref().map(|m| m.artifact.clone());
            }
        }

        let identity = stat_identity(&self.path);

        if let Some(entry) = cache.as_mut() {
            if entry.identity == identity {
                entry.checked_at = Instant::now();
                return entry.model.as_ref().map(|m| m.artifact.clone());
            }
        }

        let model = match identity {
            Some(_) => read_model(&self.path),
            None => {
                log::debug!("No model artifact at {:?}", self.path);
                None
            }
        };

        let artifact = model.as_ref().map(|m| m.artifact.clone());
        *cache = Some(CacheEntry {
            identity,
            model,
            checked_at: Instant::now(),
        });

        artifact
    }

    /// Drop the cache and read the artifact again
    pub fn reload(&self) -> Option<Arc<ModelArtifact>> {
        *self.cache.write() = None;
        log::info!("Model cache cleared, reloading from {:?}", self.path);
        self.load()
    }

    /// Describe the current model (goes through the cache)
    pub fn status(&self) -> ModelStatus {
        // Make sure the cache reflects the file
        self.load();

        let cache = self.cache.read();
        let loaded = cache.as_ref().and_then(|e| e.model.as_ref());

        ModelStatus {
            loaded: loaded.is_some(),
            path: self.path.to_string_lossy().to_string(),
            algo: loaded.map(|m| m.artifact.algo().to_string()),
            cols: loaded.map(|m| m.artifact.cols().to_vec()).unwrap_or_default(),
            checksum: loaded.map(|m| m.checksum.clone()),
            loaded_at: loaded.map(|m| m.loaded_at),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn stat_identity(path: &Path) -> Option<ArtifactIdentity> {
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    Some(ArtifactIdentity {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

fn read_model(path: &Path) -> Option<LoadedModel> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Failed to read model artifact {:?}: {}", path, e);
            return None;
        }
    };

    match ModelArtifact::decode(&bytes) {
        Ok(artifact) => {
            let checksum = hex::encode(Sha256::digest(&bytes));
            log::info!(
                "Loaded {} model from {:?} ({} cols, sha256 {})",
                artifact.algo(),
                path,
                artifact.cols().len(),
                &checksum[..12]
            );
            Some(LoadedModel {
                artifact: Arc::new(artifact),
                checksum,
                loaded_at: Utc::now(),
            })
        }
        Err(e) => {
            log::warn!("Model artifact {:?} unusable, treating as no model: {}", path, e);
            None
        }
    }
}

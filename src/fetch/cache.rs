//! Page cache keyed by URL.
//!
//! Pages live in memory for the lifetime of the process and, when a cache
//! directory is configured, on disk as `<sha256(url)>.html` so later runs
//! skip the network entirely.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::Fetcher;

#[derive(Debug, Clone, Default)]
pub struct PageCache {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    dir: Option<PathBuf>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache backed by `dir`, created if missing.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Page cache directory {:?} unavailable: {}", dir, e);
        }
        Self {
            inner: Arc::default(),
            dir: Some(dir),
        }
    }

    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        if let Some(page) = self.read_memory(url) {
            return Some(page);
        }
        let path = self.path_for(url)?;
        match std::fs::read(&path) {
            Ok(page) => {
                debug!("PageCache: loaded {} from {:?}", url, path);
                self.write_memory(url, page.clone());
                Some(page)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("PageCache: failed to read {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn store(&self, url: &str, page: Vec<u8>) {
        if let Some(path) = self.path_for(url) {
            if let Err(e) = std::fs::write(&path, &page) {
                warn!("PageCache: failed to write {:?}: {}", path, e);
            }
        }
        debug!("PageCache: stored '{}' ({} bytes)", url, page.len());
        self.write_memory(url, page);
    }

    fn read_memory(&self, url: &str) -> Option<Vec<u8>> {
        let store = self.inner.read().ok()?;
        store.get(url).cloned()
    }

    fn write_memory(&self, url: &str, page: Vec<u8>) {
        if let Ok(mut store) = self.inner.write() {
            store.insert(url.to_string(), page);
        }
    }

    fn path_for(&self, url: &str) -> Option<PathBuf> {
        self.dir.as_deref().map(|dir| cache_path(dir, url))
    }
}

fn cache_path(dir: &Path, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    dir.join(format!("{:x}.html", hasher.finalize()))
}

/// Serves pages from a [`PageCache`], falling back to the wrapped fetcher.
/// Only successful fetches are cached.
pub struct CachingFetcher<F> {
    inner: F,
    cache: PageCache,
}

impl<F: Fetcher> CachingFetcher<F> {
    pub fn new(inner: F, cache: PageCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait::async_trait]
impl<F: Fetcher> Fetcher for CachingFetcher<F> {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        if let Some(page) = self.cache.get(url) {
            info!("Cached URL '{}'", url);
            return Some(page);
        }
        info!("Uncached URL '{}'", url);
        let page = self.inner.fetch(url).await?;
        self.cache.store(url, page.clone());
        Some(page)
    }
}

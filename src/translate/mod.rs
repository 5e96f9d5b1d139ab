// Machine translation of subtitle files
//
// - google: HTTP client for the Google Translate web endpoints
// - cache: memory and on-disk cache of successful translations
// - subtitles: cue-by-cue document translation with retry passes

pub mod cache;
pub mod google;
pub mod subtitles;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use cache::{CacheInfo, TranslationCache, TranslationCacheEntry};
pub use google::GoogleTranslator;
pub use subtitles::{SubtitleTranslator, TranslationOutcome};

use crate::config::TranslateConfig;
use crate::error::Result;

/// A remote translation backend
#[async_trait]
pub trait TranslationService: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `text` from `source` (a service code or "auto") to `target`.
    /// Errors when the service gave nothing usable.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

/// Serves repeated lines from the cache and stores new successes
pub struct CachedService {
    inner: Arc<dyn TranslationService>,
    cache: TranslationCache,
}

impl CachedService {
    pub fn new(inner: Arc<dyn TranslationService>, cache: TranslationCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TranslationService for CachedService {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        if let Some(hit) = self.cache.get(source, target, text).await {
            debug!("Cache hit for '{}'", text.trim());
            return Ok(hit);
        }
        let translated = self.inner.translate(text, source, target).await?;
        self.cache.put(source, target, text, &translated).await?;
        Ok(translated)
    }
}

/// Cache configured by `translate.cache_enabled` and `translate.cache_dir`
pub fn build_cache(config: &TranslateConfig) -> TranslationCache {
    if config.cache_enabled {
        TranslationCache::persistent(&config.cache_dir)
    } else {
        TranslationCache::in_memory()
    }
}

/// The Google translator behind the configured cache
pub fn build_service(config: &TranslateConfig) -> Result<Arc<dyn TranslationService>> {
    let google: Arc<dyn TranslationService> = Arc::new(GoogleTranslator::new(config.clone())?);
    Ok(Arc::new(CachedService::new(google, build_cache(config))))
}

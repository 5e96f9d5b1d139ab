use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, SubweaveError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationCacheEntry {
    pub source_text: String,
    pub source_language: String,
    pub target_language: String,
    pub translation: String,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheInfo {
    pub entries: usize,
    pub total_size: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Successful translations, held in memory for the run and optionally
/// persisted as one JSON file per entry
pub struct TranslationCache {
    memory: Mutex<HashMap<String, String>>,
    dir: Option<PathBuf>,
}

impl TranslationCache {
    /// Memory-only cache
    pub fn in_memory() -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            dir: None,
        }
    }

    /// Cache backed by `dir`, created on first write
    pub fn persistent<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            dir: Some(dir.into()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// SHA-256 over source, target and the trimmed text
    pub fn key(source: &str, target: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(b"|");
        hasher.update(target.as_bytes());
        hasher.update(b"|");
        hasher.update(text.trim().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{}.json", key)))
    }

    pub async fn get(&self, source: &str, target: &str, text: &str) -> Option<String> {
        let key = Self::key(source, target, text);
        let cached = self.memory.lock().ok().and_then(|m| m.get(&key).cloned());
        if cached.is_some() {
            return cached;
        }

        let path = self.entry_path(&key)?;
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str::<TranslationCacheEntry>(&content) {
            Ok(entry) => {
                debug!("Translation cache hit: {} (cached {})", key, entry.cached_at);
                if let Ok(mut memory) = self.memory.lock() {
                    memory.insert(key, entry.translation.clone());
                }
                Some(entry.translation)
            }
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn put(&self, source: &str, target: &str, text: &str, translation: &str) -> Result<()> {
        let key = Self::key(source, target, text);
        self.memory
            .lock()
            .map_err(|_| SubweaveError::Cache("memory cache lock poisoned".to_string()))?
            .insert(key.clone(), translation.to_string());

        let Some(path) = self.entry_path(&key) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entry = TranslationCacheEntry {
            source_text: text.trim().to_string(),
            source_language: source.to_string(),
            target_language: target.to_string(),
            translation: translation.to_string(),
            cached_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&entry)?;
        if let Err(e) = tokio::fs::write(&path, content).await {
            warn!("Failed to write translation cache: {}", e);
        } else {
            debug!("Saved translation to cache: {}", key);
        }
        Ok(())
    }

    /// Persisted entries, newest first
    pub async fn list(&self) -> Result<Vec<TranslationCacheEntry>> {
        let mut entries = Vec::new();
        for path in self.entry_files().await? {
            if let Ok(content) = tokio::fs::read_to_string(&path).await {
                if let Ok(entry) = serde_json::from_str::<TranslationCacheEntry>(&content) {
                    entries.push(entry);
                }
            }
        }
        entries.sort_by(|a, b| b.cached_at.cmp(&a.cached_at));
        Ok(entries)
    }

    pub async fn info(&self) -> Result<CacheInfo> {
        let mut info = CacheInfo::default();
        for path in self.entry_files().await? {
            info.total_size += tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        }
        let entries = self.list().await?;
        info.entries = entries.len();
        info.newest_entry = entries.first().map(|e| e.cached_at);
        info.oldest_entry = entries.last().map(|e| e.cached_at);
        Ok(info)
    }

    /// Remove every persisted entry and the in-memory copy
    pub async fn clear(&self) -> Result<u64> {
        if let Ok(mut memory) = self.memory.lock() {
            memory.clear();
        }
        let mut count = 0;
        for path in self.entry_files().await? {
            if tokio::fs::remove_file(&path).await.is_ok() {
                count += 1;
            }
        }
        info!("Cleared {} translation cache entries", count);
        Ok(count)
    }

    async fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let Some(dir) = &self.dir else {
            return Ok(files);
        };
        if !dir.exists() {
            return Ok(files);
        }
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

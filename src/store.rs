//! Persistence of the last resolved record per match.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, WidgetError};
use crate::model::MatchRecord;

/// The cache key under which a match is persisted.
pub fn cache_key(match_id: &str) -> String {
    format!("match_{match_id}")
}

/// Key-value persistence for resolved match records.
///
/// Writes overwrite; the last writer wins.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<MatchRecord>>;
    async fn set(&self, key: &str, record: &MatchRecord) -> Result<()>;
}

fn encode(key: &str, record: &MatchRecord) -> Result<String> {
    serde_json::to_string(record).map_err(|e| WidgetError::CacheCodec {
        key: key.to_owned(),
        source: e,
    })
}

fn decode(key: &str, raw: &str) -> Result<MatchRecord> {
    serde_json::from_str(raw).map_err(|e| WidgetError::CacheCodec {
        key: key.to_owned(),
        source: e,
    })
}

/// In-process store holding serialized records, like browser local storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<MatchRecord>> {
        let entries = self.entries.read().await;
        entries.get(key).map(|raw| decode(key, raw)).transpose()
    }

    async fn set(&self, key: &str, record: &MatchRecord) -> Result<()> {
        let raw = encode(key, record)?;
        self.entries.write().await.insert(key.to_owned(), raw);
        Ok(())
    }
}

/// Store keeping one `<key>.json` file per match in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    fn tmp_path_for(&self, key: &str) -> PathBuf {
        static WRITES: AtomicU64 = AtomicU64::new(0);
        let n = WRITES.fetch_add(1, Ordering::Relaxed);
        self.path_for(key)
            .with_extension(format!("json.{}.{n}.tmp", std::process::id()))
    }
}

#[async_trait]
impl MatchStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<MatchRecord>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => decode(key, &raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WidgetError::CacheIo { path, source: e }),
        }
    }

    async fn set(&self, key: &str, record: &MatchRecord) -> Result<()> {
        let raw = encode(key, record)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| WidgetError::CacheIo {
                path: self.dir.clone(),
                source: e,
            })?;

        // Readers never observe a partially written file, and concurrent
        // writers never share a temporary file.
        let path = self.path_for(key);
        let tmp = self.tmp_path_for(key);
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| WidgetError::CacheIo {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| WidgetError::CacheIo {
                path: path.clone(),
                source: e,
            })?;
        debug!(key, path = %path.display(), "persisted match record");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{Competitor, MatchStatus, Side};

    pub(crate) fn sample_record(match_id: &str) -> MatchRecord {
        let competitor = |side: Side| Competitor {
            side,
            name: Some(format!("{side} team")),
            logo_url: None,
            score: Some(1),
            recent_form: vec![],
            statistics: BTreeMap::new(),
        };
        MatchRecord {
            match_id: match_id.to_string(),
            league_id: "eng.1".to_string(),
            home: competitor(Side::Home),
            away: competitor(Side::Away),
            status: MatchStatus::Completed,
            kickoff: None,
            events: vec![],
            season: None,
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("match-widget-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("55"), "match_55");
    }

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        assert!(store.get("match_55").await.unwrap().is_none());

        let mut record = sample_record("55");
        store.set("match_55", &record).await.unwrap();
        record.home.score = Some(3);
        store.set("match_55", &record).await.unwrap();

        let stored = store.get("match_55").await.unwrap().unwrap();
        assert_eq!(stored.home.score, Some(3));
    }

    #[tokio::test]
    async fn test_memory_store_rejects_corrupt_entry() {
        let store = MemoryStore::new();
        store
            .entries
            .write()
            .await
            .insert("match_1".to_string(), "{not json".to_string());
        let err = store.get("match_1").await.unwrap_err();
        assert!(matches!(err, WidgetError::CacheCodec { .. }));
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = temp_dir("roundtrip");
        let store = FileStore::new(&dir);
        assert!(store.get("match_77").await.unwrap().is_none());

        let record = sample_record("77");
        store.set("match_77", &record).await.unwrap();
        assert!(dir.join("match_77.json").exists());
        assert_eq!(store.get("match_77").await.unwrap(), Some(record));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_store_temp_paths_are_unique() {
        let store = FileStore::new("/tmp/cache");
        let a = store.tmp_path_for("match_55");
        let b = store.tmp_path_for("match_55");
        assert_ne!(a, b);
        assert!(a.to_string_lossy().starts_with("/tmp/cache/match_55.json."));
    }

    #[tokio::test]
    async fn test_file_store_concurrent_writes_leave_whole_record() {
        let dir = temp_dir("concurrent");
        let store = FileStore::new(&dir);
        let mut first = sample_record("55");
        first.league_id = "eng.1".to_string();
        let mut second = sample_record("55");
        second.league_id = "esp.1".to_string();

        let (a, b) = tokio::join!(
            store.set("match_55", &first),
            store.set("match_55", &second)
        );
        a.unwrap();
        b.unwrap();

        let stored = store.get("match_55").await.unwrap().unwrap();
        assert!(stored == first || stored == second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let store = FileStore::new("/tmp/cache");
        assert_eq!(
            store.path_for("match_../etc"),
            PathBuf::from("/tmp/cache/match_.._etc.json")
        );
    }
}

//! Local filesystem storage implementation.
//!
//! Keeps torrents and board checkpoints as JSON documents under one
//! directory. Writes go to a temporary file first and are renamed into
//! place, so a crash never leaves a half-written document.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Continuation, Episode, MediaReference, Movie, ParsedTorrent, Show, TorrentHandle};
use crate::storage::{Checkpoint, CursorStore, TorrentStorage};

const TORRENTS_FILE: &str = "torrents.json";
const CURSORS_FILE: &str = "cursors.json";

/// A torrent as written to `torrents.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTorrent {
    pub handle: TorrentHandle,
    pub torrent: ParsedTorrent,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct TorrentIndex {
    stored: BTreeMap<String, StoredTorrent>,
    /// Handles given out but not yet upserted
    reserved: HashMap<String, TorrentHandle>,
    next_id: u64,
}

impl TorrentIndex {
    fn key(site: &str, topic_id: &str) -> String {
        format!("{site}:{topic_id}")
    }

    fn find_or_reserve(&mut self, site: &str, topic_id: &str, media: MediaReference) -> TorrentHandle {
        let key = Self::key(site, topic_id);
        if let Some(existing) = self.stored.get(&key) {
            return TorrentHandle {
                media,
                ..existing.handle.clone()
            };
        }
        if let Some(reserved) = self.reserved.get(&key) {
            return TorrentHandle {
                media,
                ..reserved.clone()
            };
        }

        self.next_id += 1;
        let handle = TorrentHandle {
            id: self.next_id,
            site: site.to_string(),
            topic_id: topic_id.to_string(),
            media,
        };
        self.reserved.insert(key, handle.clone());
        handle
    }
}

/// Local filesystem storage backend.
#[derive(Debug)]
pub struct LocalStorage {
    root_dir: PathBuf,
    torrents: Mutex<TorrentIndex>,
    cursors: Mutex<()>,
}

impl LocalStorage {
    /// Open the storage rooted at the given directory, loading stored torrents.
    pub async fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self {
            root_dir: root_dir.into(),
            torrents: Mutex::new(TorrentIndex::default()),
            cursors: Mutex::new(()),
        };

        let stored: Vec<StoredTorrent> = storage.read_json(TORRENTS_FILE).await?.unwrap_or_default();
        {
            let mut index = storage.torrents.lock().await;
            index.next_id = stored.iter().map(|t| t.handle.id).max().unwrap_or(0);
            for torrent in stored {
                let key = TorrentIndex::key(&torrent.handle.site, &torrent.handle.topic_id);
                index.stored.insert(key, torrent);
            }
            log::debug!("Loaded {} stored torrents", index.stored.len());
        }
        Ok(storage)
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_checkpoints(&self) -> Result<BTreeMap<String, Checkpoint>> {
        Ok(self.read_json(CURSORS_FILE).await?.unwrap_or_default())
    }

    /// All stored torrents, ordered by key.
    pub async fn stored_torrents(&self) -> Vec<StoredTorrent> {
        self.torrents.lock().await.stored.values().cloned().collect()
    }

    /// All saved board checkpoints.
    pub async fn checkpoints(&self) -> Result<BTreeMap<String, Checkpoint>> {
        let _guard = self.cursors.lock().await;
        self.read_checkpoints().await
    }
}

#[async_trait]
impl TorrentStorage for LocalStorage {
    async fn find_or_create_movie_torrent(
        &self,
        site: &str,
        topic_id: &str,
        movie: &Movie,
    ) -> Result<TorrentHandle> {
        let mut index = self.torrents.lock().await;
        Ok(index.find_or_reserve(site, topic_id, MediaReference::Movie(movie.clone())))
    }

    async fn find_or_create_episode_torrent(
        &self,
        site: &str,
        topic_id: &str,
        show: &Show,
        episode: &Episode,
    ) -> Result<TorrentHandle> {
        let media = MediaReference::Episode {
            show: show.clone(),
            episode: episode.clone(),
        };
        let mut index = self.torrents.lock().await;
        Ok(index.find_or_reserve(site, topic_id, media))
    }

    async fn upsert(&self, handle: &TorrentHandle, torrent: &ParsedTorrent) -> Result<()> {
        // held across the write so files land in the order records change
        let mut index = self.torrents.lock().await;
        let key = TorrentIndex::key(&handle.site, &handle.topic_id);
        let record = StoredTorrent {
            handle: handle.clone(),
            torrent: torrent.clone(),
            updated_at: Utc::now(),
        };

        {
            let mut snapshot: BTreeMap<&String, &StoredTorrent> = index.stored.iter().collect();
            snapshot.insert(&key, &record);
            let all: Vec<&StoredTorrent> = snapshot.into_values().collect();
            self.write_json(TORRENTS_FILE, &all)
                .await
                .map_err(|e| AppError::storage(format!("writing {TORRENTS_FILE}: {e}")))?;
        }

        index.reserved.remove(&key);
        index.stored.insert(key, record);
        Ok(())
    }
}

#[async_trait]
impl CursorStore for LocalStorage {
    async fn load_cursor(&self, board_id: &str) -> Result<Option<Checkpoint>> {
        let _guard = self.cursors.lock().await;
        Ok(self.read_checkpoints().await?.remove(board_id))
    }

    async fn save_cursor(&self, board_id: &str, next: Option<&Continuation>) -> Result<()> {
        let _guard = self.cursors.lock().await;
        let mut checkpoints = self.read_checkpoints().await?;
        match next {
            Some(continuation) => {
                checkpoints.insert(
                    board_id.to_string(),
                    Checkpoint {
                        continuation: continuation.clone(),
                        saved_at: Utc::now(),
                    },
                );
            }
            None => {
                checkpoints.remove(board_id);
            }
        }
        self.write_json(CURSORS_FILE, &checkpoints)
            .await
            .map_err(|e| AppError::storage(format!("writing {CURSORS_FILE}: {e}")))
    }
}

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::fmt::Display;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::db::MetadataCache;
use crate::error::{AppError, AppResult};
use crate::models::MergedMetadataRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Normalized `title|author`
    BookMetadata(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::BookMetadata(key) => write!(f, "metadata:book:{}", key.to_lowercase()),
        }
    }
}

/// Opens a client without connecting; the URL is validated here
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

struct PendingWrite {
    key: CacheKey,
    payload: String,
}

/// Stops the background writer once every queued write has been attempted
pub struct CacheWriterHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<usize>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        match self.task.await {
            Ok(flushed) => tracing::info!(flushed, "Metadata cache writer stopped"),
            Err(e) => tracing::error!(error = %e, "Metadata cache writer panicked"),
        }
    }
}

/// Metadata cache in Redis; reads are inline, writes are queued to one writer task
#[derive(Clone)]
pub struct RedisMetadataCache {
    conn: ConnectionManager,
    queue: mpsc::UnboundedSender<PendingWrite>,
}

impl RedisMetadataCache {
    pub async fn connect(client: Client, ttl_secs: u64) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(client).await?;
        let (queue, pending) = mpsc::unbounded_channel();
        let (stop, stopped) = oneshot::channel();

        let task = tokio::spawn(run_writer(conn.clone(), ttl_secs, pending, stopped));

        Ok((Self { conn, queue }, CacheWriterHandle { stop, task }))
    }

    async fn read(&self, key: &CacheKey) -> AppResult<Option<MergedMetadataRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key.to_string()).await?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AppError::Internal(format!("corrupt cached metadata: {}", e)))
        })
        .transpose()
    }
}

async fn run_writer(
    conn: ConnectionManager,
    ttl_secs: u64,
    mut pending: mpsc::UnboundedReceiver<PendingWrite>,
    mut stopped: oneshot::Receiver<()>,
) -> usize {
    loop {
        tokio::select! {
            Some(write) = pending.recv() => store(&conn, ttl_secs, write).await,
            _ = &mut stopped => break,
            else => break,
        }
    }

    // Clones of the cache still hold senders, so only what is already queued gets flushed
    let mut flushed = 0;
    while let Ok(write) = pending.try_recv() {
        store(&conn, ttl_secs, write).await;
        flushed += 1;
    }
    flushed
}

async fn store(conn: &ConnectionManager, ttl_secs: u64, write: PendingWrite) {
    let mut conn = conn.clone();
    let result: redis::RedisResult<()> =
        conn.set_ex(write.key.to_string(), write.payload, ttl_secs).await;
    if let Err(e) = result {
        tracing::warn!(key = %write.key, error = %e, "Failed to write metadata to Redis");
    }
}

#[async_trait::async_trait]
impl MetadataCache for RedisMetadataCache {
    async fn get(&self, key: &str) -> Option<MergedMetadataRecord> {
        let key = CacheKey::BookMetadata(key.to_string());
        self.read(&key).await.unwrap_or_else(|e| {
            tracing::warn!(key = %key, error = %e, "Redis metadata lookup failed");
            None
        })
    }

    async fn put(&self, key: &str, record: &MergedMetadataRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Could not serialize metadata for caching");
                return;
            }
        };

        let write = PendingWrite {
            key: CacheKey::BookMetadata(key.to_string()),
            payload,
        };
        if self.queue.send(write).is_err() {
            tracing::warn!("Metadata cache writer is gone, dropping write");
        }
    }
}

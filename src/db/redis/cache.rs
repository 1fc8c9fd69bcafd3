use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::AppResult;
use crate::models::{Include, ListKind, MovieId};

/// Keys for catalog responses held in Redis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    MovieList { kind: ListKind, page: i64 },
    MovieDetail { id: MovieId, include: Vec<Include> },
    Search { query: String, page: i64 },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MovieList { kind, page } => write!(f, "tmdb:list:{}:{}", kind, page),
            CacheKey::MovieDetail { id, include } => {
                let sections: Vec<&str> = include.iter().map(|i| i.as_str()).collect();
                write!(f, "tmdb:movie:{}:{}", id, sections.join(","))
            }
            CacheKey::Search { query, page } => write!(
                f,
                "tmdb:search:{}:{}",
                query.trim().to_lowercase(),
                page
            ),
        }
    }
}

/// Creates a Redis client for caching
///
/// No connection is made until the first command.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

struct CacheWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Best-effort response cache in front of the movie catalog
///
/// Reads that fail are treated as misses and writes happen on a background
/// task, so Redis being down only costs latency.
#[derive(Clone)]
pub struct Cache {
    redis_client: Option<Client>,
    write_tx: Option<mpsc::UnboundedSender<CacheWrite>>,
}

/// Stops the background writer after flushing queued writes
pub struct CacheWriterHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Creates a cache backed by Redis and spawns its writer task
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            Self::writer_loop(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client: Some(redis_client),
            write_tx: Some(write_tx),
        };

        (cache, CacheWriterHandle { shutdown_tx, task })
    }

    /// A cache that never hits and drops every write
    pub fn disabled() -> Self {
        Self {
            redis_client: None,
            write_tx: None,
        }
    }

    async fn writer_loop(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWrite>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        tracing::info!("Cache writer started");

        loop {
            tokio::select! {
                msg = write_rx.recv() => match msg {
                    Some(msg) => Self::write_logged(&client, msg).await,
                    None => break,
                },
                Ok(()) = &mut shutdown_rx => {
                    // Refuse new writes, then drain what is already queued
                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        Self::write_logged(&client, msg).await;
                    }
                    break;
                }
            }
        }
    }

    async fn write_logged(client: &Client, msg: CacheWrite) {
        let key = msg.key.clone();
        if let Err(e) = Self::write(client, msg).await {
            tracing::warn!(error = %e, key = %key, "Cache write failed");
        }
    }

    async fn write(client: &Client, msg: CacheWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    async fn read(client: &Client, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    /// Returns the cached value, or `None` on a miss or any cache failure
    pub async fn lookup<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let client = self.redis_client.as_ref()?;

        let raw = match Self::read(client, key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Queues a write without waiting for Redis
    pub fn store_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let Some(write_tx) = &self.write_tx else {
            return;
        };

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWrite {
            key: key.to_string(),
            value: json,
            ttl,
        };
        if write_tx.send(msg).is_err() {
            tracing::warn!(key = %key, "Cache writer is gone, dropping write");
        }
    }
}

use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TasteProfile(UserId),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TasteProfile(uid) => write!(f, "taste:{}", uid),
        }
    }
}

impl CacheKey {
    /// Counter bumped by every invalidation of this key
    pub fn generation_key(&self) -> String {
        format!("{}:gen", self)
    }

    /// Where the value computed at `generation` is stored
    pub fn versioned(&self, generation: u64) -> String {
        format!("{}:v{}", self, generation)
    }
}

/// Outcome of a cache read
#[derive(Debug, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    /// Nothing stored for the current generation. A value computed now must
    /// be written back under this generation.
    Miss { generation: u64 },
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Work queued for the background writer
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache and spawns its background writer task
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Applies queued writes until shutdown, then drains what is left
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");
        let mut pending_writes = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    pending_writes += 1;
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    } else {
                        pending_writes -= 1;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(pending = pending_writes, "Cache writer shutting down, flushing remaining writes");

                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Looks up the value stored for the current generation of `key`
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<CacheLookup<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let generation: Option<u64> = conn.get(key.generation_key()).await?;
        let generation = generation.unwrap_or(0);
        let cached: Option<String> = conn.get(key.versioned(generation)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(CacheLookup::Hit(data))
            }
            None => Ok(CacheLookup::Miss { generation }),
        }
    }

    /// Queues a write of `value` for `generation` of `key`. Returns
    /// immediately; failures are logged by the writer task. A value written
    /// for a generation that has since been invalidated is never read.
    pub fn set_in_background<T: serde::Serialize>(
        &self,
        key: &CacheKey,
        generation: u64,
        value: &T,
        ttl: u64,
    ) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.versioned(generation),
            value: json,
            ttl,
        };
        if self.write_tx.send(msg).is_err() {
            tracing::error!("Failed to send cache write message, writer has stopped");
        }
    }

    /// Moves `key` to a new generation. Awaited by the caller, so any read
    /// issued after this returns misses every value stored before it,
    /// including fills still queued on the writer.
    pub async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: u64 = conn.incr(key.generation_key(), 1u64).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_cache_key_display_taste_profile() {
        let key = CacheKey::TasteProfile(UserId(Uuid::nil()));
        assert_eq!(
            format!("{}", key),
            "taste:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_cache_key_generations() {
        let key = CacheKey::TasteProfile(UserId(Uuid::nil()));
        assert_eq!(
            key.generation_key(),
            "taste:00000000-0000-0000-0000-000000000000:gen"
        );
        assert_eq!(
            key.versioned(3),
            "taste:00000000-0000-0000-0000-000000000000:v3"
        );
        assert_ne!(key.versioned(3), key.versioned(4));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::TasteProfile(UserId::new());
        let retrieved: CacheLookup<Vec<String>> = cache.get_from_cache(&key).await.unwrap();

        assert_eq!(retrieved, CacheLookup::Miss { generation: 0 });
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_invalidate_is_visible_immediately() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::TasteProfile(UserId::new());
        let value = vec!["Jazz".to_string(), "Blues".to_string()];

        cache.set_in_background(&key, 0, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: CacheLookup<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, CacheLookup::Hit(value));

        // no sleep: the next read must already miss
        cache.invalidate(&key).await.unwrap();
        let retrieved: CacheLookup<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, CacheLookup::Miss { generation: 1 });
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_fill_started_before_invalidate_is_never_served() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::TasteProfile(UserId::new());
        let CacheLookup::Miss { generation } =
            cache.get_from_cache::<Vec<String>>(&key).await.unwrap()
        else {
            panic!("fresh key should miss");
        };

        // a write lands while the fill is computing from older data
        cache.invalidate(&key).await.unwrap();
        cache.set_in_background(&key, generation, &vec!["stale".to_string()], 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: CacheLookup<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, CacheLookup::Miss { generation: 1 });
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_writer_graceful_shutdown() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await;

        let key = CacheKey::TasteProfile(UserId::new());
        let value = vec!["shutdown_test".to_string()];

        cache.set_in_background(&key, 0, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let retrieved: CacheLookup<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, CacheLookup::Hit(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.versioned(0)).await.unwrap();
    }
}

//! Memoization layer over an external TTL key-value store.
//!
//! Caching here is strictly a latency/cost optimization, never a
//! correctness dependency: any store failure (connect, read, or write) is
//! logged and the wrapped computation runs directly. Failed or empty
//! computations are never stored, so a failing provider is retried on every
//! call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Minimal contract the cache needs from a backing store:
/// get, set-with-expiry, and a health probe.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn ping(&self) -> Result<()>;
}

/// Redis-backed store. The connection manager reconnects on its own, so a
/// transient outage degrades to cache bypass instead of poisoning the
/// handle.
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("invalid Redis URL: {}", url))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.context("redis GET failed")?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .context("redis SETEX failed")?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("redis PING failed")?;
        Ok(())
    }
}

/// In-process store with lazy TTL expiry. Used by tests and available as a
/// single-instance fallback when no Redis URL is configured.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => {
                Ok(Some(value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Fail-open memoizing wrapper around single-key lookups.
pub struct Cache {
    store: Option<Arc<dyn KvStore>>,
    default_ttl: Duration,
}

impl Cache {
    /// A cache with no backing store; every call falls through.
    pub fn disabled() -> Self {
        Self {
            store: None,
            default_ttl: Duration::from_secs(3600),
        }
    }

    pub fn with_store(store: Arc<dyn KvStore>, default_ttl: Duration) -> Self {
        Self {
            store: Some(store),
            default_ttl,
        }
    }

    /// Connect to Redis and verify it answers. An unreachable store is not
    /// an error: the service starts with caching disabled.
    pub async fn connect(url: &str, default_ttl: Duration) -> Self {
        match RedisStore::connect(url).await {
            Ok(store) => match store.ping().await {
                Ok(()) => {
                    debug!("cache backend connected: {}", url);
                    Self::with_store(Arc::new(store), default_ttl)
                }
                Err(e) => {
                    warn!("cache backend unreachable, caching disabled: {}", e);
                    Self::disabled()
                }
            },
            Err(e) => {
                warn!("cache backend unreachable, caching disabled: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Health probe for the front door.
    pub async fn healthy(&self) -> bool {
        match &self.store {
            Some(store) => store.ping().await.is_ok(),
            None => false,
        }
    }

    /// Deterministic key from an operation name and its ordered arguments.
    ///
    /// Arguments are positional: callers with map-like inputs must pass them
    /// in a canonical (sorted) order. The unit separator keeps `["ab","c"]`
    /// and `["a","bc"]` distinct.
    pub fn key(operation: &str, args: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        for arg in args {
            hasher.update([0x1f]);
            hasher.update(arg.as_bytes());
        }
        format!("{}:{:x}", operation, hasher.finalize())
    }

    /// Memoize `compute` under `(operation, args)`.
    ///
    /// A non-empty result is stored with `ttl` (or the configured default);
    /// `None` is returned uncached. Store failures at any point degrade to
    /// calling `compute` directly.
    pub async fn cached<T, F, Fut>(
        &self,
        operation: &str,
        args: &[&str],
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let Some(store) = &self.store else {
            return compute().await;
        };

        let key = Self::key(operation, args);

        match store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("cache hit: {}", operation);
                    return Ok(Some(value));
                }
                Err(e) => {
                    // Stale schema or corrupted entry; recompute and let the
                    // fresh value overwrite it.
                    warn!("cache entry for {} undecodable: {}", operation, e);
                }
            },
            Ok(None) => debug!("cache miss: {}", operation),
            Err(e) => warn!("cache read failed for {}: {}", operation, e),
        }

        let value = compute().await?;

        if let Some(v) = &value {
            match serde_json::to_string(v) {
                Ok(raw) => {
                    let ttl = ttl.unwrap_or(self.default_ttl);
                    if let Err(e) = store.set_ex(&key, &raw, ttl).await {
                        warn!("cache write failed for {}: {}", operation, e);
                    }
                }
                Err(e) => warn!("cache serialization failed for {}: {}", operation, e),
            }
        }

        Ok(value)
    }
}

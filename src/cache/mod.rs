//! Redis cache layer for domain configuration

use crate::config::RedisConfig;
use crate::domain::Domain;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Cache key prefixes and channels
mod keys {
    pub const DOMAIN_CONFIG: &str = "warden:domain";
    pub const DOMAIN_EVENTS: &str = "warden:domain:events";
}

mod ttl {
    pub const DOMAIN_CONFIG_SECS: u64 = 600; // 10 minutes
}

/// Event published to gateway instances when a domain changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Updated { domain: String },
    Reloaded { domain: String },
    Deleted { domain: String },
}

/// Caches domain configuration and propagates changes to running gateways
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainNotifier: Send + Sync {
    /// Cached configuration of domain `id`, if any
    async fn cached_domain(&self, id: &str) -> Result<Option<Domain>>;
    /// Fill the cache after a repository read, without notifying gateways
    async fn cache_domain(&self, domain: &Domain) -> Result<()>;
    /// Refresh the cached configuration of `domain`
    async fn domain_updated(&self, domain: &Domain) -> Result<()>;
    /// Refresh the cache and ask gateways to reload `domain`
    async fn domain_reloaded(&self, domain: &Domain) -> Result<()>;
    /// Drop every cached trace of domain `id`
    async fn domain_deleted(&self, id: &str) -> Result<()>;
}

/// Cache manager for Redis operations
#[derive(Clone)]
pub struct CacheManager {
    conn: ConnectionManager,
}

impl CacheManager {
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e))
        })?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { conn })
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => {
                let parsed = serde_json::from_str(&v).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Cache deserialize error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let serialized = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cache serialize error: {}", e)))?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Event serialize error: {}", e)))?;

        let receivers: i64 = conn.publish(keys::DOMAIN_EVENTS, payload).await?;
        tracing::debug!(?event, receivers, "Published domain event");
        Ok(())
    }

    /// Cached configuration of a domain
    pub async fn get_domain(&self, id: &str) -> Result<Option<Domain>> {
        self.get(&domain_key(id)).await
    }

    pub async fn set_domain(&self, domain: &Domain) -> Result<()> {
        self.set(
            &domain_key(&domain.id),
            domain,
            Duration::from_secs(ttl::DOMAIN_CONFIG_SECS),
        )
        .await
    }

    pub async fn invalidate_domain(&self, id: &str) -> Result<()> {
        self.delete(&domain_key(id)).await
    }
}

fn domain_key(id: &str) -> String {
    format!("{}:{}", keys::DOMAIN_CONFIG, id)
}

#[async_trait]
impl DomainNotifier for CacheManager {
    async fn cached_domain(&self, id: &str) -> Result<Option<Domain>> {
        self.get_domain(id).await
    }

    async fn cache_domain(&self, domain: &Domain) -> Result<()> {
        self.set_domain(domain).await
    }

    async fn domain_updated(&self, domain: &Domain) -> Result<()> {
        self.set_domain(domain).await?;
        self.publish(&DomainEvent::Updated {
            domain: domain.id.clone(),
        })
        .await
    }

    async fn domain_reloaded(&self, domain: &Domain) -> Result<()> {
        self.set_domain(domain).await?;
        self.publish(&DomainEvent::Reloaded {
            domain: domain.id.clone(),
        })
        .await
    }

    async fn domain_deleted(&self, id: &str) -> Result<()> {
        self.invalidate_domain(id).await?;
        self.publish(&DomainEvent::Deleted {
            domain: id.to_string(),
        })
        .await
    }
}

/// Notifier for deployments without Redis, and for tests
#[derive(Clone, Default)]
pub struct NoOpCacheManager;

impl NoOpCacheManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DomainNotifier for NoOpCacheManager {
    async fn cached_domain(&self, _id: &str) -> Result<Option<Domain>> {
        Ok(None)
    }

    async fn cache_domain(&self, _domain: &Domain) -> Result<()> {
        Ok(())
    }

    async fn domain_updated(&self, _domain: &Domain) -> Result<()> {
        Ok(())
    }

    async fn domain_reloaded(&self, _domain: &Domain) -> Result<()> {
        Ok(())
    }

    async fn domain_deleted(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

/// Either the Redis cache or nothing, chosen from configuration at startup
#[derive(Clone)]
pub enum Notifier {
    Redis(CacheManager),
    Disabled(NoOpCacheManager),
}

impl Notifier {
    pub async fn from_config(config: Option<&RedisConfig>) -> Result<Self> {
        match config {
            Some(redis) => Ok(Notifier::Redis(CacheManager::new(redis).await?)),
            None => {
                tracing::info!("REDIS_URL not set, domain cache disabled");
                Ok(Notifier::Disabled(NoOpCacheManager::new()))
            }
        }
    }
}

#[async_trait]
impl DomainNotifier for Notifier {
    async fn cached_domain(&self, id: &str) -> Result<Option<Domain>> {
        match self {
            Notifier::Redis(cache) => cache.cached_domain(id).await,
            Notifier::Disabled(noop) => noop.cached_domain(id).await,
        }
    }

    async fn cache_domain(&self, domain: &Domain) -> Result<()> {
        match self {
            Notifier::Redis(cache) => cache.cache_domain(domain).await,
            Notifier::Disabled(noop) => noop.cache_domain(domain).await,
        }
    }

    async fn domain_updated(&self, domain: &Domain) -> Result<()> {
        match self {
            Notifier::Redis(cache) => cache.domain_updated(domain).await,
            Notifier::Disabled(noop) => noop.domain_updated(domain).await,
        }
    }

    async fn domain_reloaded(&self, domain: &Domain) -> Result<()> {
        match self {
            Notifier::Redis(cache) => cache.domain_reloaded(domain).await,
            Notifier::Disabled(noop) => noop.domain_reloaded(domain).await,
        }
    }

    async fn domain_deleted(&self, id: &str) -> Result<()> {
        match self {
            Notifier::Redis(cache) => cache.domain_deleted(id).await,
            Notifier::Disabled(noop) => noop.domain_deleted(id).await,
        }
    }
}

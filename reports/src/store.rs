/// Backing stores for cached reports. The cache itself only needs string
/// values keyed by string, written in co-expiring pairs, so providers stay
/// interchangeable between the production store and the in-memory one used
/// in tests and local development.
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("cache store error: {0}")]
    Connection(#[from] redis::RedisError),
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write both entries under one logical transaction so value and
    /// metadata commit and expire together.
    async fn set_pair(
        &self,
        entries: [(&str, &str); 2],
        ttl_secs: u64,
    ) -> Result<(), StoreError>;

    async fn delete(&self, keys: &[&str]) -> Result<(), StoreError>;
}

pub struct RedisReportStore {
    conn: ConnectionManager,
}

impl RedisReportStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(RedisReportStore { conn })
    }
}

#[async_trait]
impl ReportStore for RedisReportStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_pair(
        &self,
        entries: [(&str, &str); 2],
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.set_ex(key, value, ttl_secs);
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys.to_vec()).await?;
        Ok(())
    }
}

/// Store for tests and local development. Retention TTLs are ignored; the
/// expiry policy belongs to the real store.
#[derive(Default)]
pub struct InMemoryReportStore {
    data: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set_pair(
        &self,
        entries: [(&str, &str); 2],
        _ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        for (key, value) in entries {
            data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

/// TTL of a presence key; clients refresh it with a heartbeat.
pub const PRESENCE_TTL_SECS: u64 = 120;

pub fn presence_key(user_id: &Uuid) -> String {
    format!("online:{user_id}")
}

#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url = %url, "connected to Redis");
        Ok(Self { conn })
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    pub async fn del(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await
    }

    pub async fn exists_multi(&self, keys: &[String]) -> Result<Vec<bool>, redis::RedisError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.exists(key.as_str());
        }
        pipe.query_async(&mut conn).await
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    // -- presence --

    pub async fn mark_online(&self, user_id: &Uuid) -> Result<(), redis::RedisError> {
        self.set(&presence_key(user_id), "1", PRESENCE_TTL_SECS).await
    }

    pub async fn mark_offline(&self, user_id: &Uuid) -> Result<(), redis::RedisError> {
        self.del(&presence_key(user_id)).await
    }

    /// Online flags in the same order as `user_ids`. Errors read as offline.
    pub async fn online_flags(&self, user_ids: &[Uuid]) -> Vec<bool> {
        let keys: Vec<String> = user_ids.iter().map(presence_key).collect();
        match self.exists_multi(&keys).await {
            Ok(flags) => flags,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read presence keys");
                vec![false; user_ids.len()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_key_format() {
        let id = Uuid::nil();
        assert_eq!(presence_key(&id), "online:00000000-0000-0000-0000-000000000000");
    }
}

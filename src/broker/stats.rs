use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

const CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(8);

/// TTL'd snapshot of broker metadata for the three event streams: stream
/// length and last ids plus the consumer group's description. One shared
/// slot for all callers; the admin connection is established lazily, once,
/// behind the mutex.
#[derive(Clone)]
pub struct BrokerStatsCache {
    client: redis::Client,
    topics: Vec<String>,
    group: String,
    slot: Arc<RwLock<Option<(Instant, serde_json::Value)>>>,
    conn: Arc<Mutex<Option<redis::aio::MultiplexedConnection>>>,
}

impl BrokerStatsCache {
    pub fn new(client: redis::Client, topics: Vec<String>, group: String) -> Self {
        Self {
            client,
            topics,
            group,
            slot: Arc::new(RwLock::new(None)),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Fresh-enough cached snapshot, or a live fetch. A fetch failure
    /// propagates to the caller and leaves the last good value in place.
    pub async fn snapshot(&self) -> Result<serde_json::Value> {
        {
            let read = self.slot.read().await;
            if let Some((fetched_at, stats)) = &*read {
                if fetched_at.elapsed() <= CACHE_TTL {
                    return Ok(stats.clone());
                }
            }
        }

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.client.get_multiplexed_async_connection().await?);
        }
        let Some(conn) = guard.as_mut() else {
            anyhow::bail!("broker admin connection unavailable");
        };

        let fetched = self.fetch(conn).await;
        if fetched.is_err() {
            // Dead connections are discarded so the next call reconnects.
            *guard = None;
        }
        let stats = fetched?;

        let mut write = self.slot.write().await;
        *write = Some((Instant::now(), stats.clone()));
        Ok(stats)
    }

    async fn fetch(&self, conn: &mut redis::aio::MultiplexedConnection) -> Result<serde_json::Value> {
        let mut topics = Vec::new();
        let mut members: i64 = 0;
        let mut pending_total: i64 = 0;
        let mut group_seen = false;

        for topic in &self.topics {
            let info: HashMap<String, redis::Value> = redis::cmd("XINFO")
                .arg("STREAM")
                .arg(topic)
                .query_async(conn)
                .await?;

            let groups: Vec<HashMap<String, redis::Value>> = redis::cmd("XINFO")
                .arg("GROUPS")
                .arg(topic)
                .query_async(conn)
                .await?;

            let group = groups.iter().find(|g| {
                str_field(g, "name").as_deref() == Some(self.group.as_str())
            });

            if let Some(group) = group {
                group_seen = true;
                members = members.max(int_field(group, "consumers"));
                pending_total += int_field(group, "pending");
            }

            topics.push(json!({
                "name": topic,
                "length": int_field(&info, "length"),
                "lastGeneratedId": str_field(&info, "last-generated-id"),
                "group": group.map(|g| json!({
                    "name": str_field(g, "name"),
                    "consumers": int_field(g, "consumers"),
                    "pending": int_field(g, "pending"),
                    "lastDeliveredId": str_field(g, "last-delivered-id"),
                    "lag": int_field(g, "lag"),
                })),
            }));
        }

        Ok(json!({
            "topics": topics,
            "consumerGroup": if group_seen {
                json!({
                    "groupId": self.group,
                    "members": members,
                    "pending": pending_total,
                })
            } else {
                serde_json::Value::Null
            },
            "fetchedAt": Utc::now(),
        }))
    }
}

fn int_field(map: &HashMap<String, redis::Value>, key: &str) -> i64 {
    map.get(key)
        .and_then(|v| redis::from_redis_value::<i64>(v).ok())
        .unwrap_or(0)
}

fn str_field(map: &HashMap<String, redis::Value>, key: &str) -> Option<String> {
    map.get(key).and_then(|v| redis::from_redis_value::<String>(v).ok())
}

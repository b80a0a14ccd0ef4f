use anyhow::Result;
use redis::streams::StreamReadReply;

use crate::ingest::pipeline::IngestPipeline;

/// Consumer-group loop over the three event streams. One entry at a time
/// per stream, in stream order; entries are acked even when the handler
/// fails, so the dedup registry is the only record of "did we try".
pub struct StreamConsumer {
    pub redis_client: redis::Client,
    pub streams: Vec<String>,
    pub group: String,
    pub consumer_name: String,
    pub pipeline: IngestPipeline,
}

impl StreamConsumer {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.consume().await {
                tracing::error!("consumer error: {}, reconnecting", err);
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }

    async fn consume(&self) -> Result<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        // BUSYGROUP on re-create is expected and ignored.
        for stream in &self.streams {
            let _: redis::RedisResult<String> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(stream)
                .arg(&self.group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;
        }

        tracing::info!("consumer {} started on {:?}", self.consumer_name, self.streams);

        let cursors: Vec<&str> = self.streams.iter().map(|_| ">").collect();

        loop {
            let read: redis::RedisResult<StreamReadReply> = redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(&self.group)
                .arg(&self.consumer_name)
                .arg("COUNT")
                .arg(100)
                .arg("BLOCK")
                .arg(2000)
                .arg("STREAMS")
                .arg(&self.streams)
                .arg(&cursors)
                .query_async(&mut conn)
                .await;

            // A block timeout replies nil, which fails reply parsing;
            // treat it as an empty batch. IO errors still reconnect.
            let reply = match read {
                Ok(reply) => reply,
                Err(err) if err.kind() == redis::ErrorKind::TypeError => {
                    StreamReadReply { keys: vec![] }
                }
                Err(err) => return Err(err.into()),
            };

            for stream_key in reply.keys {
                for entry in stream_key.ids {
                    let raw = entry
                        .map
                        .get("event")
                        .and_then(|v| redis::from_redis_value::<String>(v).ok());

                    if let Some(raw) = raw {
                        if let Err(err) = self.pipeline.handle_message(&stream_key.key, &raw).await
                        {
                            tracing::error!(
                                "error processing message on {}: {:#}",
                                stream_key.key,
                                err
                            );
                        }
                    }

                    let _: i64 = redis::cmd("XACK")
                        .arg(&stream_key.key)
                        .arg(&self.group)
                        .arg(&entry.id)
                        .query_async(&mut conn)
                        .await
                        .unwrap_or(0);
                }
            }
        }
    }
}

//! Remote in-memory store
//!
//! Redis-backed store selected by `redis:` URLs. Keys are scoped by a
//! namespace prefix; compare-and-swap runs as a server-side Lua script so
//! the read-check-write is a single atomic round trip. The queue
//! capability maps straight onto the native list primitives, which is why
//! repair workers prefer this backend in production.

use std::future::Future;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio_util::sync::CancellationToken;

use crate::store::{check_cancel, check_key, KeyValueStore, QueueStore, StoreError};

/// Reserved key (within the namespace) holding the queue list.
const QUEUE_SUFFIX: &[u8] = b"__queue";

/// Atomic compare-and-swap: ARGV[1] = "1" when the key must be absent,
/// ARGV[2] = expected value, ARGV[3] = "1" to set ARGV[4] / "0" to delete.
const CAS_SCRIPT: &str = r#"
local cur = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
  if cur then return 'exists' end
else
  if not cur then return 'missing' end
  if cur ~= ARGV[2] then return 'conflict' end
end
if ARGV[3] == '1' then
  redis.call('SET', KEYS[1], ARGV[4])
else
  redis.call('DEL', KEYS[1])
end
return 'ok'
"#;

/// Client to a remote key-value service.
pub struct RedisStore {
    conn: MultiplexedConnection,
    ns: Vec<u8>,
    queue_key: Vec<u8>,
    cas: redis::Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("ns", &String::from_utf8_lossy(&self.ns))
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to the service at `url` (full `redis://host:port/db` form)
    /// and scope all keys under `namespace`.
    pub async fn open(url: &str, namespace: &str) -> Result<Self, StoreError> {
        if namespace.is_empty() {
            return Err(StoreError::InvalidArgument("empty namespace".into()));
        }
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        let ns = format!("{}/", namespace).into_bytes();
        let mut queue_key = ns.clone();
        queue_key.extend_from_slice(QUEUE_SUFFIX);

        Ok(Self {
            conn,
            ns,
            queue_key,
            cas: redis::Script::new(CAS_SCRIPT),
        })
    }

    fn scoped(&self, key: &[u8]) -> Vec<u8> {
        let mut scoped = Vec::with_capacity(self.ns.len() + key.len());
        scoped.extend_from_slice(&self.ns);
        scoped.extend_from_slice(key);
        scoped
    }

    /// Race a command against cancellation; the remote call is the
    /// suspension point.
    async fn run<T>(
        &self,
        cancel: &CancellationToken,
        fut: impl Future<Output = redis::RedisResult<T>> + Send,
    ) -> Result<T, StoreError> {
        check_cancel(cancel)?;
        tokio::select! {
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            res = fut => res.map_err(StoreError::from),
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, cancel: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        check_key(key)?;
        let mut conn = self.conn.clone();
        let scoped = self.scoped(key);
        let value: Option<Vec<u8>> = self
            .run(cancel, async move { conn.get(scoped).await })
            .await?;
        value.ok_or(StoreError::NotFound)
    }

    async fn put(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StoreError> {
        check_key(key)?;
        let mut conn = self.conn.clone();
        let scoped = self.scoped(key);
        let value = value.to_vec();
        self.run(cancel, async move { conn.set(scoped, value).await })
            .await
    }

    async fn delete(&self, cancel: &CancellationToken, key: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        let mut conn = self.conn.clone();
        let scoped = self.scoped(key);
        let removed: i64 = self
            .run(cancel, async move { conn.del(scoped).await })
            .await?;
        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut pattern = escape_match_pattern(&self.scoped(prefix));
        pattern.push(b'*');
        let ns_len = self.ns.len();
        let queue_key = self.queue_key.clone();

        self.run(cancel, async move {
            // SCAN returns keys in no particular order (and may repeat);
            // collect, sort, then fetch values in one MGET.
            let mut keys: Vec<Vec<u8>> = Vec::new();
            {
                let mut iter = conn.scan_match::<_, Vec<u8>>(pattern).await?;
                while let Some(key) = iter.next_item().await {
                    if key != queue_key {
                        keys.push(key);
                    }
                }
            }
            keys.sort();
            keys.dedup();
            keys.truncate(limit);
            if keys.is_empty() {
                return Ok(Vec::new());
            }

            let values: Vec<Option<Vec<u8>>> = conn.mget(&keys).await?;
            Ok(keys
                .into_iter()
                .zip(values)
                .filter_map(|(key, value)| value.map(|v| (key[ns_len..].to_vec(), v)))
                .collect())
        })
        .await
    }

    async fn compare_and_swap(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<(), StoreError> {
        check_key(key)?;
        let mut conn = self.conn.clone();
        let scoped = self.scoped(key);

        let mut invocation = self.cas.key(scoped);
        invocation
            .arg(if expected.is_none() { "1" } else { "0" })
            .arg(expected.unwrap_or_default())
            .arg(if new.is_some() { "1" } else { "0" })
            .arg(new.unwrap_or_default());

        let status: String = self
            .run(cancel, async move { invocation.invoke_async(&mut conn).await })
            .await?;
        match status.as_str() {
            "ok" => Ok(()),
            "exists" => Err(StoreError::AlreadyExists),
            "missing" => Err(StoreError::NotFound),
            "conflict" => Err(StoreError::Conflict),
            other => Err(StoreError::Backend(format!(
                "unexpected swap status: {other}"
            ))),
        }
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn push(&self, cancel: &CancellationToken, item: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let queue_key = self.queue_key.clone();
        let item = item.to_vec();
        let _len: i64 = self
            .run(cancel, async move { conn.rpush(queue_key, item).await })
            .await?;
        Ok(())
    }

    async fn pop(&self, cancel: &CancellationToken) -> Result<Vec<u8>, StoreError> {
        let mut conn = self.conn.clone();
        let queue_key = self.queue_key.clone();
        let item: Option<Vec<u8>> = self
            .run(cancel, async move { conn.lpop(queue_key, None).await })
            .await?;
        item.ok_or(StoreError::QueueEmpty)
    }

    async fn peek(
        &self,
        cancel: &CancellationToken,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let queue_key = self.queue_key.clone();
        let stop = limit as isize - 1;
        self.run(cancel, async move { conn.lrange(queue_key, 0, stop).await })
            .await
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Escape glob metacharacters so a binary prefix matches literally in
/// SCAN MATCH patterns.
fn escape_match_pattern(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for &byte in raw {
        if matches!(byte, b'*' | b'?' | b'[' | b']' | b'^' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_match_pattern;

    #[test]
    fn escapes_glob_metacharacters() {
        assert_eq!(escape_match_pattern(b"a*b?c"), b"a\\*b\\?c".to_vec());
        assert_eq!(escape_match_pattern(b"plain"), b"plain".to_vec());
    }
}

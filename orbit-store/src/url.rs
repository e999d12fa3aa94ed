//! Backend selection
//!
//! Callers configure storage with a `scheme:source` URL. `bolt:` selects
//! the embedded single-file store rooted at the given path, `redis:` the
//! remote store, and `mem:` the in-memory test store.

use std::sync::Arc;

use crate::embedded::EmbeddedStore;
use crate::memory::MemoryStore;
use crate::remote::RedisStore;
use crate::store::{KeyValueStore, StoreError};

/// Split a `scheme:source` database URL.
pub fn parse_store_url(url: &str) -> Result<(&str, &str), StoreError> {
    url.split_once(':')
        .ok_or_else(|| StoreError::InvalidArgument(format!("malformed database URL: {url}")))
}

/// Open the backend selected by `url`, scoping its keys under `namespace`.
pub async fn open_store(url: &str, namespace: &str) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    let (scheme, source) = parse_store_url(url)?;
    match scheme {
        "bolt" => Ok(Arc::new(EmbeddedStore::open(source, namespace)?)),
        "redis" => Ok(Arc::new(RedisStore::open(url, namespace).await?)),
        "mem" => Ok(Arc::new(MemoryStore::new())),
        other => Err(StoreError::UnsupportedBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_scheme_and_source() {
        assert_eq!(
            parse_store_url("bolt:/tmp/overlay.db").unwrap(),
            ("bolt", "/tmp/overlay.db")
        );
        assert_eq!(
            parse_store_url("redis://127.0.0.1:6379/1").unwrap(),
            ("redis", "//127.0.0.1:6379/1")
        );
        assert!(parse_store_url("no-scheme").is_err());
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let err = open_store("sqlite:/tmp/db", "test").await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedBackend(s) if s == "sqlite"));
    }

    #[tokio::test]
    async fn memory_scheme_opens() {
        assert!(open_store("mem:", "test").await.is_ok());
    }
}

// crates/extract/src/store.rs
use async_trait::async_trait;
use bytes::Bytes;
use common::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Low-level object operations, implemented by each storage backend.
/// Pagination, retries and timeouts belong to the implementation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Keys in `bucket` starting with `prefix`, in the order the store returns them
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Full object body
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Create or overwrite an object
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()>;
}

/// In-process object store. Buckets must be created before use, and keys
/// list in lexicographic order like S3's ListObjectsV2.
#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.buckets.write().entry(bucket.to_string()).or_default();
    }

    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Bytes>) -> Result<()> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects.insert(key.to_string(), body.into());
        Ok(())
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map(|o| o.len()).unwrap_or(0)
    }
}

fn no_such_bucket(bucket: &str) -> Error {
    Error::NotFound(format!("bucket {}", bucket))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let buckets = self.buckets.read();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;

        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let buckets = self.buckets.read();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes, _content_type: &str) -> Result<()> {
        self.insert(bucket, key, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_is_ordered_and_prefix_scoped() {
        let store = MemoryObjectStore::new();
        store.create_bucket("b");
        for key in ["z.csv", "prefix/b.csv", "prefix/a.csv", "prefixed.csv", "other/a.csv"] {
            store.insert("b", key, "x").unwrap();
        }

        let keys = store.list_keys("b", "prefix/").await.unwrap();
        assert_eq!(keys, vec!["prefix/a.csv", "prefix/b.csv"]);

        let all = store.list_keys("b", "").await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_bucket_and_key() {
        let store = MemoryObjectStore::new();
        assert!(store.list_keys("nope", "").await.unwrap_err().is_not_found());

        store.create_bucket("b");
        assert!(store.get_object("b", "missing").await.unwrap_err().is_not_found());
        assert!(store.insert("nope", "k", "v").is_err());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryObjectStore::new();
        store.create_bucket("b");
        store.put_object("b", "k", Bytes::from_static(b"one"), "text/plain").await.unwrap();
        store.put_object("b", "k", Bytes::from_static(b"two"), "text/plain").await.unwrap();

        assert_eq!(store.get_object("b", "k").await.unwrap(), Bytes::from_static(b"two"));
        assert_eq!(store.object_count("b"), 1);
    }
}

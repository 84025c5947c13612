//! CloudStore is a [`BlobStore`] over any `object_store` backend.
//!
//! Production wires an S3 bucket through [`CloudStore::s3`]; tests use
//! `object_store::memory::InMemory`. Pagination, request signing and
//! transient retries are handled inside `object_store`.

use crate::{
    models::stored::StoredObject,
    services::blob_store::{BlobStore, StorageError, StorageResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload, aws::AmazonS3Builder,
    path::Path as ObjectPath,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CloudStore {
    store: Arc<dyn ObjectStore>,
}

impl CloudStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Connect to `bucket` in `region`.
    ///
    /// Credentials come from the standard `AWS_*` environment variables or
    /// the instance metadata service.
    pub fn s3(bucket: &str, region: &str) -> StorageResult<Self> {
        let s3 = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(region)
            .build()?;
        Ok(Self::new(Arc::new(s3)))
    }

    fn object_path(key: &str) -> StorageResult<ObjectPath> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        ObjectPath::parse(key).map_err(|_| StorageError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
impl BlobStore for CloudStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        let path = Self::object_path(key)?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let size = body.len();
        self.store
            .put_opts(&path, PutPayload::from(body), opts)
            .await?;
        debug!("put {} ({} bytes)", path, size);
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<StoredObject>> {
        let metas: Vec<_> = self.store.list(None).try_collect().await?;

        let mut objects: Vec<StoredObject> = metas
            .into_iter()
            .map(|meta| StoredObject {
                key: meta.location.to_string(),
                size: meta.size as u64,
                last_modified: meta.last_modified,
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = Self::object_path(key)?;
        let result = self.store.get(&path).await.map_err(|err| match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::ObjectStore(other),
        })?;
        Ok(result.bytes().await?)
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}

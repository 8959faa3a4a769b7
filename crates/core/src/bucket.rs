//! Bucket management for static website hosting

use crate::backend::{paginate, BucketSummary, ObjectSummary, Page, StorageBackend, WebsiteDocuments};
use crate::endpoints::{self, WebsiteEndpoint};
use crate::error::{Error, Result};
use crate::sync::{StorageSync, SyncReport};
use futures::stream::BoxStream;
use std::path::Path;
use std::sync::Arc;

/// Handle to a bucket created or located by [`BucketManager::init_bucket`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    pub region: String,
}

/// Bucket policy granting anonymous read access to every object
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicReadGetObject",
            "Effect": "Allow",
            "Principal": "*",
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{}/*", bucket)]
        }]
    })
    .to_string()
}

/// Normalize a raw location constraint into a region name
pub fn region_from_constraint(constraint: Option<&str>) -> String {
    match constraint {
        None | Some("") => "us-east-1".to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}

/// Creates and configures website buckets
pub struct BucketManager {
    storage: Arc<dyn StorageBackend>,
    region: String,
    website: WebsiteDocuments,
    concurrency: usize,
}

impl BucketManager {
    pub fn new(storage: Arc<dyn StorageBackend>, region: impl Into<String>) -> Self {
        Self {
            storage,
            region: region.into(),
            website: WebsiteDocuments {
                index_document: "index.html".to_string(),
                error_document: "error.html".to_string(),
            },
            concurrency: 5,
        }
    }

    /// Override the index and error documents
    pub fn with_website(mut self, website: WebsiteDocuments) -> Self {
        self.website = website;
        self
    }

    /// Set how many uploads a sync runs at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn website(&self) -> &WebsiteDocuments {
        &self.website
    }

    /// Every bucket owned by the account
    pub fn all_buckets(&self) -> BoxStream<'static, Result<BucketSummary>> {
        let storage = Arc::clone(&self.storage);
        paginate(move |_| {
            let storage = Arc::clone(&storage);
            async move { Ok(Page::last(storage.list_buckets().await?)) }
        })
    }

    /// Every object in a bucket, fetched page by page as the stream is read
    pub fn all_objects<'a>(&'a self, bucket: &'a str) -> BoxStream<'a, Result<ObjectSummary>> {
        paginate(move |token| self.storage.list_objects(bucket, token))
    }

    /// Create the bucket, or return it if the account already owns it
    pub async fn init_bucket(&self, name: &str) -> Result<Bucket> {
        let region = match self.storage.create_bucket(name, &self.region).await {
            Ok(()) => {
                tracing::info!("Created bucket {} in {}", name, self.region);
                self.region.clone()
            }
            Err(Error::BucketAlreadyOwned(_)) => {
                // An owned bucket may live outside the session region
                let region = self.get_bucket_location(name).await?;
                tracing::debug!("Bucket {} already exists in {} and is owned by you", name, region);
                region
            }
            Err(e) => return Err(e),
        };

        Ok(Bucket {
            name: name.to_string(),
            region,
        })
    }

    /// Allow anyone to read the bucket's objects
    pub async fn set_policy(&self, bucket: &Bucket) -> Result<()> {
        self.storage.delete_public_access_block(&bucket.name).await?;
        self.storage
            .put_bucket_policy(&bucket.name, &public_read_policy(&bucket.name))
            .await?;

        tracing::info!("Applied public read policy to {}", bucket.name);
        Ok(())
    }

    /// Enable static website hosting
    pub async fn configure_website(&self, bucket: &Bucket) -> Result<()> {
        self.storage.put_bucket_website(&bucket.name, &self.website).await?;

        tracing::info!(
            "Website hosting enabled on {} (index: {}, error: {})",
            bucket.name,
            self.website.index_document,
            self.website.error_document
        );
        Ok(())
    }

    /// Region the bucket lives in
    pub async fn get_bucket_location(&self, name: &str) -> Result<String> {
        let constraint = self.storage.get_bucket_location(name).await?;
        Ok(region_from_constraint(constraint.as_deref()))
    }

    /// Website endpoint serving the bucket
    pub async fn get_bucket_endpoint(&self, name: &str) -> Result<WebsiteEndpoint> {
        endpoints::get_endpoint(&self.get_bucket_location(name).await?)
    }

    /// Public website URL of the bucket
    pub async fn get_bucket_url(&self, name: &str) -> Result<String> {
        Ok(self.get_bucket_endpoint(name).await?.bucket_url(name))
    }

    /// Sync engine bound to this manager's storage
    pub fn storage_sync(&self) -> StorageSync {
        StorageSync::new(Arc::clone(&self.storage), self.concurrency)
    }

    /// Upload the tree below `root` into `bucket`
    pub async fn sync(&self, root: &Path, bucket: &str) -> Result<SyncReport> {
        self.storage_sync().sync(root, bucket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStorage;
    use futures::TryStreamExt;

    fn manager(storage: &Arc<MemoryStorage>, region: &str) -> BucketManager {
        BucketManager::new(storage.clone(), region)
    }

    #[tokio::test]
    async fn test_init_bucket_is_idempotent() {
        let storage = Arc::new(MemoryStorage::new());
        let buckets = manager(&storage, "eu-west-1");

        let first = buckets.init_bucket("my-bucket").await.unwrap();
        let second = buckets.init_bucket("my-bucket").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name, "my-bucket");
        assert_eq!(storage.create_calls(), 2);
        assert_eq!(storage.bucket_names(), vec!["my-bucket".to_string()]);
    }

    #[tokio::test]
    async fn test_init_owned_bucket_keeps_its_region() {
        let storage = Arc::new(MemoryStorage::new().with_bucket("site", "eu-central-1"));
        let buckets = manager(&storage, "us-east-1");

        let bucket = buckets.init_bucket("site").await.unwrap();

        assert_eq!(bucket.region, "eu-central-1");
        assert_eq!(
            buckets.get_bucket_url(&bucket.name).await.unwrap(),
            "http://site.s3-website.eu-central-1.amazonaws.com"
        );
    }

    #[tokio::test]
    async fn test_set_policy_unblocks_and_grants_read() {
        let storage = Arc::new(MemoryStorage::new());
        let buckets = manager(&storage, "us-east-1");
        let bucket = buckets.init_bucket("site").await.unwrap();

        buckets.set_policy(&bucket).await.unwrap();

        assert!(storage.public_access_unblocked("site"));
        let policy: serde_json::Value = serde_json::from_str(&storage.policy("site").unwrap()).unwrap();
        let statement = &policy["Statement"][0];
        assert_eq!(statement["Principal"], "*");
        assert_eq!(statement["Action"][0], "s3:GetObject");
        assert_eq!(statement["Resource"][0], "arn:aws:s3:::site/*");
    }

    #[tokio::test]
    async fn test_configure_website_uses_documents() {
        let storage = Arc::new(MemoryStorage::new());
        let documents = WebsiteDocuments {
            index_document: "home.html".to_string(),
            error_document: "404.html".to_string(),
        };
        let buckets = manager(&storage, "us-east-1").with_website(documents.clone());
        let bucket = buckets.init_bucket("site").await.unwrap();

        buckets.configure_website(&bucket).await.unwrap();

        assert_eq!(storage.website("site"), Some(documents));
    }

    #[tokio::test]
    async fn test_all_objects_follows_pages() {
        let storage = Arc::new(MemoryStorage::new().with_page_size(2));
        let buckets = manager(&storage, "us-east-1");
        buckets.init_bucket("site").await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        for name in ["a.html", "b.html", "c.html", "d.html", "e.html"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        buckets.sync(dir.path(), "site").await.unwrap();

        let keys: Vec<String> = buckets
            .all_objects("site")
            .map_ok(|o| o.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, vec!["a.html", "b.html", "c.html", "d.html", "e.html"]);
    }

    #[tokio::test]
    async fn test_all_buckets() {
        let storage = Arc::new(
            MemoryStorage::new()
                .with_bucket("alpha", "us-east-1")
                .with_bucket("beta", "eu-west-1"),
        );
        let buckets = manager(&storage, "us-east-1");

        let names: Vec<String> = buckets.all_buckets().map_ok(|b| b.name).try_collect().await.unwrap();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_bucket_location_and_url() {
        let storage = Arc::new(
            MemoryStorage::new()
                .with_bucket("east", "us-east-1")
                .with_bucket("example.com", "eu-central-1"),
        );
        let buckets = manager(&storage, "us-east-1");

        assert_eq!(buckets.get_bucket_location("east").await.unwrap(), "us-east-1");
        assert_eq!(
            buckets.get_bucket_url("east").await.unwrap(),
            "http://east.s3-website-us-east-1.amazonaws.com"
        );
        assert_eq!(
            buckets.get_bucket_url("example.com").await.unwrap(),
            "http://example.com.s3-website.eu-central-1.amazonaws.com"
        );
    }

    #[test]
    fn test_region_from_constraint() {
        assert_eq!(region_from_constraint(None), "us-east-1");
        assert_eq!(region_from_constraint(Some("")), "us-east-1");
        assert_eq!(region_from_constraint(Some("EU")), "eu-west-1");
        assert_eq!(region_from_constraint(Some("ap-south-1")), "ap-south-1");
    }
}

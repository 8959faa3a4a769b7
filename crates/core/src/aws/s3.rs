//! S3 backend using the AWS S3 SDK

use crate::backend::{BucketSummary, ObjectSummary, ObjectUpload, Page, StorageBackend, WebsiteDocuments};
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    primitives::ByteStream,
    types::{
        BucketLocationConstraint, CreateBucketConfiguration, ErrorDocument, IndexDocument,
        ObjectCannedAcl, ObjectOwnership, WebsiteConfiguration,
    },
    Client,
};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// S3 storage backend
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Create a new S3 backend
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Read a file fully into memory
    async fn read_file(path: &std::path::Path) -> Result<Vec<u8>> {
        let mut file = File::open(path).await?;
        let metadata = file.metadata().await?;
        let mut buffer = Vec::with_capacity(metadata.len() as usize);
        file.read_to_end(&mut buffer).await?;
        Ok(buffer)
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        let response = self.client.list_buckets().send().await?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| BucketSummary {
                name: b.name().unwrap_or_default().to_string(),
                creation_date: b.creation_date().cloned(),
            })
            .collect();

        Ok(buckets)
    }

    async fn list_objects(&self, bucket: &str, token: Option<String>) -> Result<Page<ObjectSummary>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(token)
            .send()
            .await?;

        let items = response
            .contents()
            .iter()
            .map(|obj| ObjectSummary {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0),
                last_modified: obj.last_modified().cloned(),
            })
            .collect();

        let next = match response.is_truncated() {
            Some(true) => response.next_continuation_token().map(|s| s.to_string()),
            _ => None,
        };

        Ok(Page { items, next })
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut request = self
            .client
            .create_bucket()
            .bucket(bucket)
            .object_ownership(ObjectOwnership::BucketOwnerPreferred);

        // us-east-1 rejects an explicit location constraint
        if region != super::DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let owned = e
                    .as_service_error()
                    .map(|se| se.is_bucket_already_owned_by_you())
                    .unwrap_or(false);
                if owned {
                    Err(Error::BucketAlreadyOwned(bucket.to_string()))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn delete_public_access_block(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_public_access_block()
            .bucket(bucket)
            .send()
            .await?;

        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await?;

        Ok(())
    }

    async fn put_bucket_website(&self, bucket: &str, documents: &WebsiteDocuments) -> Result<()> {
        let website = WebsiteConfiguration::builder()
            .index_document(IndexDocument::builder().suffix(&documents.index_document).build()?)
            .error_document(ErrorDocument::builder().key(&documents.error_document).build()?)
            .build();

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(website)
            .send()
            .await?;

        Ok(())
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await?;

        Ok(response
            .location_constraint()
            .map(|c| c.as_str().to_string())
            .filter(|c| !c.is_empty()))
    }

    async fn upload_object(&self, upload: &ObjectUpload) -> Result<()> {
        let body = Self::read_file(&upload.path).await?;

        let mut request = self
            .client
            .put_object()
            .bucket(&upload.bucket)
            .key(&upload.key)
            .body(ByteStream::from(body))
            .content_type(&upload.content_type);

        if upload.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request.send().await?;

        Ok(())
    }
}

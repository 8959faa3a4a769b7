//! Provider seams for the managers
//!
//! Each manager talks to its cloud service through one of these traits. The
//! AWS SDK implementations live in [`crate::aws`]; the in-memory ones used by
//! the tests live in [`crate::testing`].

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::future::Future;
use std::path::PathBuf;

/// One page of a paginated listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token or marker for the next page
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// A page with no successor
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Turn a page fetcher into a lazy stream of items.
///
/// `fetch` receives `None` for the first page and the previous page's `next`
/// token afterwards. No request is made until the stream is polled.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> BoxStream<'a, Result<T>>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
{
    enum Cursor {
        Start,
        Next(String),
        Done,
    }

    stream::try_unfold((Cursor::Start, fetch), |(cursor, mut fetch)| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok::<_, Error>(None),
        };

        let page = fetch(token).await?;
        let cursor = match page.next {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };

        let items = stream::iter(page.items.into_iter().map(Ok::<T, Error>));
        Ok(Some((items, (cursor, fetch))))
    })
    .try_flatten()
    .boxed()
}

// === Object storage ===

/// Bucket as listed for the account
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSummary {
    pub name: String,
    pub creation_date: Option<aws_smithy_types::DateTime>,
}

/// Object as listed inside a bucket
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<aws_smithy_types::DateTime>,
}

/// A single file upload
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUpload {
    pub bucket: String,
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: String,
    pub public_read: bool,
}

/// Index and error documents of a website bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteDocuments {
    pub index_document: String,
    pub error_document: String,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>>;

    async fn list_objects(&self, bucket: &str, token: Option<String>) -> Result<Page<ObjectSummary>>;

    /// Create a bucket. Fails with [`Error::BucketAlreadyOwned`] when the
    /// caller already owns a bucket with this name.
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    async fn delete_public_access_block(&self, bucket: &str) -> Result<()>;

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()>;

    async fn put_bucket_website(&self, bucket: &str, documents: &WebsiteDocuments) -> Result<()>;

    /// Raw location constraint; `None` for buckets in us-east-1
    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>>;

    async fn upload_object(&self, upload: &ObjectUpload) -> Result<()>;
}

// === DNS ===

/// Route 53 hosted zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    pub id: String,
    /// Dot terminated zone name, e.g. `example.com.`
    pub name: String,
}

/// Target of an alias record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub hosted_zone_id: String,
    pub dns_name: String,
    pub evaluate_target_health: bool,
}

/// Alias record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    pub name: String,
    pub record_type: String,
    pub target: AliasTarget,
}

#[async_trait]
pub trait DnsBackend: Send + Sync {
    async fn list_hosted_zones(&self, marker: Option<String>) -> Result<Page<HostedZone>>;

    async fn create_hosted_zone(&self, name: &str, caller_reference: &str) -> Result<HostedZone>;

    /// Create the record, or replace it if one with the same name and type exists
    async fn upsert_record(&self, zone_id: &str, record: &AliasRecord, comment: &str) -> Result<()>;
}

// === Certificates ===

/// Entry of the certificate listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub arn: String,
}

/// Certificate details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub arn: String,
    pub status: Option<String>,
    pub subject_alternative_names: Vec<String>,
}

#[async_trait]
pub trait CertificateBackend: Send + Sync {
    async fn list_issued_certificates(&self, token: Option<String>) -> Result<Page<CertificateSummary>>;

    async fn describe_certificate(&self, arn: &str) -> Result<Certificate>;
}

// === CDN ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionStatus {
    InProgress,
    Deployed,
    Other(String),
}

impl DistributionStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "InProgress" => Self::InProgress,
            "Deployed" => Self::Deployed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "InProgress"),
            Self::Deployed => write!(f, "Deployed"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// CloudFront distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub id: String,
    /// Edge host name assigned by CloudFront, e.g. `d111111abcdef8.cloudfront.net`
    pub domain_name: String,
    pub aliases: Vec<String>,
    pub status: DistributionStatus,
}

/// Everything needed to create a distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionRequest {
    pub caller_reference: String,
    pub alias: String,
    pub origin_id: String,
    pub origin_domain: String,
    pub default_root_object: String,
    pub certificate_arn: String,
    pub comment: String,
}

#[async_trait]
pub trait CdnBackend: Send + Sync {
    async fn list_distributions(&self, marker: Option<String>) -> Result<Page<Distribution>>;

    async fn create_distribution(&self, request: &DistributionRequest) -> Result<Distribution>;

    async fn get_distribution(&self, id: &str) -> Result<Distribution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paginate_follows_tokens() {
        let pages = vec![
            Page { items: vec![1, 2], next: Some("a".to_string()) },
            Page { items: vec![], next: Some("b".to_string()) },
            Page::last(vec![3]),
        ];
        let mut seen_tokens = Vec::new();
        let mut pages = pages.into_iter();

        let items: Vec<i32> = {
            let seen = &mut seen_tokens;
            paginate(move |token| {
                seen.push(token);
                let page = pages.next().unwrap_or_else(|| Page::last(vec![]));
                async move { Ok(page) }
            })
            .try_collect()
            .await
            .unwrap()
        };

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(seen_tokens, vec![None, Some("a".to_string()), Some("b".to_string())]);
    }

    #[tokio::test]
    async fn test_paginate_stops_at_first_error() {
        let mut calls = 0;
        let result: Result<Vec<i32>> = paginate(move |_| {
            calls += 1;
            let out = if calls == 1 {
                Ok(Page { items: vec![1], next: Some("x".to_string()) })
            } else {
                Err(Error::AwsSdk("boom".to_string()))
            };
            async move { out }
        })
        .try_collect()
        .await;

        assert!(matches!(result, Err(Error::AwsSdk(_))));
    }

    #[test]
    fn test_distribution_status_parse() {
        assert_eq!(DistributionStatus::parse("InProgress"), DistributionStatus::InProgress);
        assert_eq!(DistributionStatus::parse("Deployed"), DistributionStatus::Deployed);
        assert_eq!(
            DistributionStatus::parse("Disabled"),
            DistributionStatus::Other("Disabled".to_string())
        );
        assert_eq!(DistributionStatus::Deployed.to_string(), "Deployed");
    }
}

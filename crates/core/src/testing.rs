//! In-memory backends for tests
//!
//! Each fake keeps just enough state to behave like the real service for the
//! calls the managers make: bucket ownership, record upserts, paginated
//! listings and distribution status changes.

use crate::backend::{
    BucketSummary, CdnBackend, Certificate, CertificateBackend, CertificateSummary,
    DnsBackend, Distribution, DistributionRequest, DistributionStatus, HostedZone, ObjectSummary,
    ObjectUpload, Page, AliasRecord, StorageBackend, WebsiteDocuments,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// Split `items` into pages of `page_size`, using the start index as token
fn page_of<T: Clone>(items: &[T], token: Option<String>, page_size: usize) -> Result<Page<T>> {
    let start = match token {
        Some(t) => t
            .parse::<usize>()
            .map_err(|_| Error::InvalidInput(format!("bad page token {}", t)))?,
        None => 0,
    };
    let end = (start + page_size).min(items.len());
    let next = (end < items.len()).then(|| end.to_string());

    Ok(Page {
        items: items.get(start..end).map(|s| s.to_vec()).unwrap_or_default(),
        next,
    })
}

// === Storage ===

#[derive(Default)]
struct StorageState {
    /// bucket name -> region
    buckets: BTreeMap<String, String>,
    /// (bucket, key) -> upload
    objects: BTreeMap<(String, String), ObjectUpload>,
    policies: HashMap<String, String>,
    websites: HashMap<String, WebsiteDocuments>,
    unblocked: HashSet<String>,
    failing_keys: HashSet<String>,
    create_calls: usize,
}

/// In-memory object storage owned by a single account
pub struct MemoryStorage {
    state: Mutex<StorageState>,
    page_size: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            page_size: 1000,
        }
    }

    /// Use small pages to exercise continuation tokens
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register a bucket as already owned by the caller
    pub fn with_bucket(self, name: &str, region: &str) -> Self {
        self.lock().buckets.insert(name.to_string(), region.to_string());
        self
    }

    /// Make every upload of `key` fail
    pub fn fail_uploads_of(&self, key: &str) {
        self.lock().failing_keys.insert(key.to_string());
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.lock().buckets.keys().cloned().collect()
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Uploaded objects of a bucket, ordered by key
    pub fn objects(&self, bucket: &str) -> Vec<ObjectUpload> {
        self.lock()
            .objects
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .map(|(_, o)| o.clone())
            .collect()
    }

    pub fn policy(&self, bucket: &str) -> Option<String> {
        self.lock().policies.get(bucket).cloned()
    }

    pub fn website(&self, bucket: &str) -> Option<WebsiteDocuments> {
        self.lock().websites.get(bucket).cloned()
    }

    pub fn public_access_unblocked(&self, bucket: &str) -> bool {
        self.lock().unblocked.contains(bucket)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StorageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn require_bucket(state: &StorageState, bucket: &str) -> Result<()> {
        if state.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(Error::AwsSdk(format!("NoSuchBucket: {}", bucket)))
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        Ok(self
            .lock()
            .buckets
            .keys()
            .map(|name| BucketSummary {
                name: name.clone(),
                creation_date: None,
            })
            .collect())
    }

    async fn list_objects(&self, bucket: &str, token: Option<String>) -> Result<Page<ObjectSummary>> {
        let state = self.lock();
        Self::require_bucket(&state, bucket)?;

        let objects: Vec<ObjectSummary> = state
            .objects
            .values()
            .filter(|o| o.bucket == bucket)
            .map(|o| ObjectSummary {
                key: o.key.clone(),
                size: o.size as i64,
                last_modified: None,
            })
            .collect();

        page_of(&objects, token, self.page_size)
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut state = self.lock();
        state.create_calls += 1;
        if state.buckets.contains_key(bucket) {
            return Err(Error::BucketAlreadyOwned(bucket.to_string()));
        }
        state.buckets.insert(bucket.to_string(), region.to_string());
        Ok(())
    }

    async fn delete_public_access_block(&self, bucket: &str) -> Result<()> {
        let mut state = self.lock();
        Self::require_bucket(&state, bucket)?;
        state.unblocked.insert(bucket.to_string());
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        let mut state = self.lock();
        Self::require_bucket(&state, bucket)?;
        if !state.unblocked.contains(bucket) {
            return Err(Error::AwsSdk(format!("AccessDenied: public policies blocked on {}", bucket)));
        }
        state.policies.insert(bucket.to_string(), policy.to_string());
        Ok(())
    }

    async fn put_bucket_website(&self, bucket: &str, documents: &WebsiteDocuments) -> Result<()> {
        let mut state = self.lock();
        Self::require_bucket(&state, bucket)?;
        state.websites.insert(bucket.to_string(), documents.clone());
        Ok(())
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>> {
        let state = self.lock();
        Self::require_bucket(&state, bucket)?;
        // S3 reports an empty constraint for us-east-1
        Ok(state
            .buckets
            .get(bucket)
            .filter(|region| region.as_str() != "us-east-1")
            .cloned())
    }

    async fn upload_object(&self, upload: &ObjectUpload) -> Result<()> {
        let mut state = self.lock();
        Self::require_bucket(&state, &upload.bucket)?;
        if state.failing_keys.contains(&upload.key) {
            return Err(Error::AwsSdk(format!("InternalError uploading {}", upload.key)));
        }
        state
            .objects
            .insert((upload.bucket.clone(), upload.key.clone()), upload.clone());
        Ok(())
    }
}

// === DNS ===

#[derive(Default)]
struct DnsState {
    zones: Vec<HostedZone>,
    caller_references: HashSet<String>,
    /// (zone id, name, type) -> record
    records: BTreeMap<(String, String, String), AliasRecord>,
}

/// In-memory Route 53
pub struct MemoryDns {
    state: Mutex<DnsState>,
    page_size: usize,
}

impl Default for MemoryDns {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDns {
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add an existing zone, listed in insertion order
    pub fn with_zone(self, id: &str, name: &str) -> Self {
        self.lock().zones.push(HostedZone {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn zones(&self) -> Vec<HostedZone> {
        self.lock().zones.clone()
    }

    /// Records of a zone, ordered by name and type
    pub fn records(&self, zone_id: &str) -> Vec<AliasRecord> {
        self.lock()
            .records
            .iter()
            .filter(|((z, _, _), _)| z == zone_id)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DnsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DnsBackend for MemoryDns {
    async fn list_hosted_zones(&self, marker: Option<String>) -> Result<Page<HostedZone>> {
        let state = self.lock();
        page_of(&state.zones, marker, self.page_size)
    }

    async fn create_hosted_zone(&self, name: &str, caller_reference: &str) -> Result<HostedZone> {
        let mut state = self.lock();
        if !state.caller_references.insert(caller_reference.to_string()) {
            return Err(Error::AwsSdk(format!(
                "HostedZoneAlreadyExists: caller reference {} reused",
                caller_reference
            )));
        }
        let zone = HostedZone {
            id: format!("/hostedzone/Z{:04}", state.zones.len() + 1),
            name: name.to_string(),
        };
        state.zones.push(zone.clone());
        Ok(zone)
    }

    async fn upsert_record(&self, zone_id: &str, record: &AliasRecord, _comment: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.zones.iter().any(|z| z.id == zone_id) {
            return Err(Error::AwsSdk(format!("NoSuchHostedZone: {}", zone_id)));
        }

        let key = (
            zone_id.to_string(),
            record.name.clone(),
            record.record_type.clone(),
        );
        state.records.insert(key, record.clone());
        Ok(())
    }
}

// === Certificates ===

/// In-memory ACM inventory
pub struct MemoryCertificates {
    certificates: Vec<Certificate>,
    page_size: usize,
    describe_calls: Mutex<usize>,
}

impl Default for MemoryCertificates {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCertificates {
    pub fn new() -> Self {
        Self {
            certificates: Vec::new(),
            page_size: 100,
            describe_calls: Mutex::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_certificate(mut self, arn: &str, status: &str, names: &[&str]) -> Self {
        self.certificates.push(Certificate {
            arn: arn.to_string(),
            status: Some(status.to_string()),
            subject_alternative_names: names.iter().map(|n| n.to_string()).collect(),
        });
        self
    }

    pub fn describe_calls(&self) -> usize {
        *self.describe_calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CertificateBackend for MemoryCertificates {
    async fn list_issued_certificates(&self, token: Option<String>) -> Result<Page<CertificateSummary>> {
        let issued: Vec<CertificateSummary> = self
            .certificates
            .iter()
            .filter(|c| c.status.as_deref() == Some("ISSUED"))
            .map(|c| CertificateSummary { arn: c.arn.clone() })
            .collect();

        page_of(&issued, token, self.page_size)
    }

    async fn describe_certificate(&self, arn: &str) -> Result<Certificate> {
        *self.describe_calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        self.certificates
            .iter()
            .find(|c| c.arn == arn)
            .cloned()
            .ok_or_else(|| Error::AwsSdk(format!("ResourceNotFoundException: {}", arn)))
    }
}

// === CDN ===

struct CdnEntry {
    distribution: Distribution,
    request: Option<DistributionRequest>,
    /// Number of polls still reporting InProgress
    polls_until_deployed: usize,
    polls: usize,
}

/// In-memory CloudFront. New distributions report `InProgress` for a
/// configurable number of `get_distribution` calls, then `Deployed`.
pub struct MemoryCdn {
    entries: Mutex<Vec<CdnEntry>>,
    deploy_after_polls: usize,
}

impl Default for MemoryCdn {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCdn {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            deploy_after_polls: 0,
        }
    }

    /// New distributions stay `InProgress` for `polls` status checks
    pub fn deploy_after_polls(mut self, polls: usize) -> Self {
        self.deploy_after_polls = polls;
        self
    }

    /// Add an existing deployed distribution
    pub fn with_distribution(self, id: &str, domain_name: &str, aliases: &[&str]) -> Self {
        self.lock().push(CdnEntry {
            distribution: Distribution {
                id: id.to_string(),
                domain_name: domain_name.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                status: DistributionStatus::Deployed,
            },
            request: None,
            polls_until_deployed: 0,
            polls: 0,
        });
        self
    }

    pub fn distributions(&self) -> Vec<Distribution> {
        self.lock().iter().map(|e| e.distribution.clone()).collect()
    }

    /// Request a distribution was created from
    pub fn request(&self, id: &str) -> Option<DistributionRequest> {
        self.lock()
            .iter()
            .find(|e| e.distribution.id == id)
            .and_then(|e| e.request.clone())
    }

    /// Number of status checks made against a distribution
    pub fn polls(&self, id: &str) -> usize {
        self.lock()
            .iter()
            .find(|e| e.distribution.id == id)
            .map(|e| e.polls)
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CdnEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CdnBackend for MemoryCdn {
    async fn list_distributions(&self, marker: Option<String>) -> Result<Page<Distribution>> {
        page_of(&self.distributions(), marker, 100)
    }

    async fn create_distribution(&self, request: &DistributionRequest) -> Result<Distribution> {
        let mut entries = self.lock();
        if entries.iter().any(|e| e.distribution.aliases.contains(&request.alias)) {
            return Err(Error::AwsSdk(format!("CNAMEAlreadyExists: {}", request.alias)));
        }

        let n = entries.len() + 1;
        let distribution = Distribution {
            id: format!("E{:04}", n),
            domain_name: format!("d{:04}.cloudfront.net", n),
            aliases: vec![request.alias.clone()],
            status: if self.deploy_after_polls == 0 {
                DistributionStatus::Deployed
            } else {
                DistributionStatus::InProgress
            },
        };
        entries.push(CdnEntry {
            distribution: distribution.clone(),
            request: Some(request.clone()),
            polls_until_deployed: self.deploy_after_polls,
            polls: 0,
        });
        Ok(distribution)
    }

    async fn get_distribution(&self, id: &str) -> Result<Distribution> {
        let mut entries = self.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.distribution.id == id)
            .ok_or_else(|| Error::AwsSdk(format!("NoSuchDistribution: {}", id)))?;

        entry.polls += 1;
        if entry.polls_until_deployed > 0 {
            entry.polls_until_deployed -= 1;
        }
        entry.distribution.status = if entry.polls_until_deployed == 0 {
            DistributionStatus::Deployed
        } else {
            DistributionStatus::InProgress
        };
        Ok(entry.distribution.clone())
    }
}

//! Wiring of backends into the managers a command needs

use crate::aws::Session;
use crate::backend::{CdnBackend, CertificateBackend, DnsBackend, StorageBackend, WebsiteDocuments};
use crate::bucket::BucketManager;
use crate::certificate::CertificateManager;
use crate::config::ConfigFile;
use crate::distribution::{DeployWait, DistributionManager};
use crate::domain::DomainManager;
use std::sync::Arc;

/// Provider implementations, one per service
pub struct Backends {
    pub storage: Arc<dyn StorageBackend>,
    pub dns: Arc<dyn DnsBackend>,
    pub certificates: Arc<dyn CertificateBackend>,
    pub cdn: Arc<dyn CdnBackend>,
}

impl Backends {
    /// AWS-backed providers sharing one session
    pub fn from_session(session: &Session) -> Self {
        Self {
            storage: Arc::new(session.s3()),
            dns: Arc::new(session.route53()),
            certificates: Arc::new(session.acm()),
            cdn: Arc::new(session.cloudfront()),
        }
    }
}

/// Managers for one invocation, built once and handed to each command
pub struct Context {
    pub region: String,
    pub buckets: BucketManager,
    pub domains: DomainManager,
    pub certificates: CertificateManager,
    pub distributions: DistributionManager,
    pub deploy_wait: DeployWait,
}

impl Context {
    pub fn new(backends: Backends, region: impl Into<String>, config: &ConfigFile) -> Self {
        let region = region.into();
        let website = WebsiteDocuments {
            index_document: config.website.index_document.clone(),
            error_document: config.website.error_document.clone(),
        };

        Self {
            buckets: BucketManager::new(backends.storage, region.clone())
                .with_website(website)
                .with_concurrency(config.max_concurrent_uploads()),
            domains: DomainManager::new(backends.dns),
            certificates: CertificateManager::new(backends.certificates),
            distributions: DistributionManager::new(backends.cdn, region.clone())
                .with_default_root_object(config.website.index_document.clone()),
            deploy_wait: DeployWait::from(&config.cdn),
            region,
        }
    }

    pub fn from_session(session: &Session, config: &ConfigFile) -> Self {
        Self::new(Backends::from_session(session), session.region(), config)
    }
}

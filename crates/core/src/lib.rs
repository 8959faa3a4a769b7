//! sitepilot-core - Core library for the sitepilot CLI
//!
//! This library deploys static websites on AWS: S3 buckets configured for
//! website hosting, Route 53 alias records, ACM certificate lookup and
//! CloudFront distributions. Every service sits behind a backend trait so the
//! managers can run against the AWS SDK or against in-memory fakes.

pub mod aws;
pub mod backend;
pub mod bucket;
pub mod certificate;
pub mod config;
pub mod context;
pub mod distribution;
pub mod domain;
pub mod endpoints;
pub mod error;
pub mod provision;
pub mod sync;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export commonly used types
pub use aws::Session;
pub use backend::{
    AliasRecord, BucketSummary, Certificate, Distribution, DistributionStatus, HostedZone,
    ObjectSummary, WebsiteDocuments,
};
pub use bucket::{Bucket, BucketManager};
pub use certificate::{cert_matches, CertificateManager};
pub use config::{
    get_config_path, load_config_from, load_config_or_default, render_config, validate_config,
};
pub use config::ConfigFile;
pub use context::{Backends, Context};
pub use distribution::{DeployWait, DistributionManager};
pub use domain::DomainManager;
pub use endpoints::{get_endpoint, WebsiteEndpoint};
pub use error::{Error, Result};
pub use provision::{CdnOutcome, CdnSetup, CdnState};
pub use sync::{StorageSync, SyncReport};

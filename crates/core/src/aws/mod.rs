//! AWS session and SDK-backed implementations of the provider traits

mod acm;
mod cloudfront;
mod route53;
mod s3;

pub use acm::AcmBackend;
pub use cloudfront::CloudFrontBackend;
pub use route53::Route53Backend;
pub use s3::S3Backend;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Region used when neither the profile nor the caller provides one
pub const DEFAULT_REGION: &str = "us-east-1";

/// CloudFront only accepts ACM certificates issued in this region
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// Authenticated AWS session shared by every backend
#[derive(Debug, Clone)]
pub struct Session {
    config: SdkConfig,
    region: String,
}

impl Session {
    /// Load credentials and region from the environment and shared config
    /// files, optionally for a named profile.
    pub async fn load(profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            tracing::debug!("Using AWS profile {}", profile);
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }

        let config = loader.load().await;
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        tracing::debug!("AWS session ready in {}", region);

        Self { config, region }
    }

    /// Region the session targets
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn s3(&self) -> S3Backend {
        let conf = aws_sdk_s3::config::Builder::from(&self.config)
            .region(Region::new(self.region.clone()))
            .build();
        S3Backend::new(aws_sdk_s3::Client::from_conf(conf))
    }

    pub fn route53(&self) -> Route53Backend {
        Route53Backend::new(aws_sdk_route53::Client::new(&self.config))
    }

    pub fn acm(&self) -> AcmBackend {
        let conf = aws_sdk_acm::config::Builder::from(&self.config)
            .region(Region::new(CERTIFICATE_REGION))
            .build();
        AcmBackend::new(aws_sdk_acm::Client::from_conf(conf))
    }

    pub fn cloudfront(&self) -> CloudFrontBackend {
        CloudFrontBackend::new(aws_sdk_cloudfront::Client::new(&self.config))
    }
}

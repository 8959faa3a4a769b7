//! CloudFront distributions in front of website buckets

use crate::backend::{paginate, CdnBackend, Certificate, Distribution, DistributionRequest, DistributionStatus};
use crate::config::CdnConfig;
use crate::domain::normalize_domain;
use crate::endpoints::{self, WebsiteEndpoint};
use crate::error::{Error, Result};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long and how often to poll a distribution until it is deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployWait {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for DeployWait {
    fn default() -> Self {
        Self::from(&CdnConfig::default())
    }
}

impl From<&CdnConfig> for DeployWait {
    fn from(config: &CdnConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.deploy_timeout(),
        }
    }
}

/// Finds, creates and waits on distributions
pub struct DistributionManager {
    cdn: Arc<dyn CdnBackend>,
    region: String,
    default_root_object: String,
}

impl DistributionManager {
    pub fn new(cdn: Arc<dyn CdnBackend>, region: impl Into<String>) -> Self {
        Self {
            cdn,
            region: region.into(),
            default_root_object: "index.html".to_string(),
        }
    }

    /// Object served for requests to the root URL
    pub fn with_default_root_object(mut self, object: impl Into<String>) -> Self {
        self.default_root_object = object.into();
        self
    }

    /// Distribution that already serves `domain`
    pub async fn find_matching_dist(&self, domain: &str) -> Result<Option<Distribution>> {
        let domain = normalize_domain(domain);
        let mut distributions = paginate(move |marker| self.cdn.list_distributions(marker));

        while let Some(dist) = distributions.try_next().await? {
            if dist.aliases.iter().any(|alias| normalize_domain(alias) == domain) {
                tracing::debug!("Distribution {} serves {}", dist.id, domain);
                return Ok(Some(dist));
            }
        }

        Ok(None)
    }

    /// Create a distribution whose origin is the bucket named after `domain`
    /// in the session region
    pub async fn create_dist(&self, domain: &str, cert: &Certificate) -> Result<Distribution> {
        let endpoint = endpoints::get_endpoint(&self.region)?;
        self.create_dist_for_bucket(domain, domain, &endpoint, cert).await
    }

    /// Create a distribution for `domain` served from `bucket`'s website endpoint
    pub async fn create_dist_for_bucket(
        &self,
        domain: &str,
        bucket: &str,
        endpoint: &WebsiteEndpoint,
        cert: &Certificate,
    ) -> Result<Distribution> {
        let domain = normalize_domain(domain);
        let origin_domain = endpoint.bucket_host(bucket);

        let request = DistributionRequest {
            caller_reference: uuid::Uuid::new_v4().to_string(),
            alias: domain.clone(),
            origin_id: format!("S3-Website-{}", origin_domain),
            origin_domain,
            default_root_object: self.default_root_object.clone(),
            certificate_arn: cert.arn.clone(),
            comment: format!("Created by sitepilot for {}", domain),
        };

        let dist = self.cdn.create_distribution(&request).await?;
        tracing::info!(
            "Created distribution {} ({}) for {}",
            dist.id,
            dist.domain_name,
            domain
        );
        Ok(dist)
    }

    /// Wait until the distribution reports `Deployed`.
    ///
    /// Fails with [`Error::Timeout`] once `wait.timeout` elapses and with
    /// [`Error::Cancelled`] as soon as `cancel` fires.
    pub async fn await_deploy(
        &self,
        dist: &Distribution,
        wait: &DeployWait,
        cancel: &CancellationToken,
    ) -> Result<Distribution> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(wait.timeout, self.poll_until_deployed(&dist.id, wait.poll_interval)) => {
                result.unwrap_or_else(|_| Err(Error::Timeout))
            }
        }
    }

    async fn poll_until_deployed(&self, id: &str, interval: Duration) -> Result<Distribution> {
        loop {
            let current = self.cdn.get_distribution(id).await?;
            if current.status == DistributionStatus::Deployed {
                tracing::info!("Distribution {} deployed", id);
                return Ok(current);
            }

            tracing::debug!("Distribution {} is {}, waiting {:?}", id, current.status, interval);
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryCdn;

    fn cert() -> Certificate {
        Certificate {
            arn: "arn:aws:acm:us-east-1:123456789012:certificate/site".to_string(),
            status: Some("ISSUED".to_string()),
            subject_alternative_names: vec!["*.example.com".to_string()],
        }
    }

    fn quick_wait(timeout_ms: u64) -> DeployWait {
        DeployWait {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn test_find_matching_dist() {
        let cdn = Arc::new(
            MemoryCdn::new()
                .with_distribution("E1", "d1.cloudfront.net", &["blog.example.com"])
                .with_distribution("E2", "d2.cloudfront.net", &["shop.example.com", "www.example.com"]),
        );
        let dists = DistributionManager::new(cdn, "us-east-1");

        let found = dists.find_matching_dist("www.example.com").await.unwrap().unwrap();
        assert_eq!(found.id, "E2");
        assert!(dists.find_matching_dist("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_dist_targets_website_endpoint() {
        let cdn = Arc::new(MemoryCdn::new().deploy_after_polls(2));
        let dists = DistributionManager::new(cdn.clone(), "eu-west-1")
            .with_default_root_object("home.html");

        let dist = dists.create_dist("www.example.com", &cert()).await.unwrap();
        assert_eq!(dist.status, DistributionStatus::InProgress);
        assert_eq!(dist.aliases, vec!["www.example.com".to_string()]);

        let request = cdn.request(&dist.id).unwrap();
        assert_eq!(
            request.origin_domain,
            "www.example.com.s3-website-eu-west-1.amazonaws.com"
        );
        assert_eq!(request.certificate_arn, cert().arn);
        assert_eq!(request.default_root_object, "home.html");
    }

    #[tokio::test]
    async fn test_create_dist_for_named_bucket() {
        let cdn = Arc::new(MemoryCdn::new());
        let dists = DistributionManager::new(cdn.clone(), "us-east-1");
        let endpoint = endpoints::get_endpoint("eu-central-1").unwrap();

        let dist = dists
            .create_dist_for_bucket("www.example.com", "site-assets", &endpoint, &cert())
            .await
            .unwrap();

        let request = cdn.request(&dist.id).unwrap();
        assert_eq!(request.origin_domain, "site-assets.s3-website.eu-central-1.amazonaws.com");
    }

    #[tokio::test]
    async fn test_await_deploy_waits_for_deployed() {
        let cdn = Arc::new(MemoryCdn::new().deploy_after_polls(3));
        let dists = DistributionManager::new(cdn.clone(), "us-east-1");
        let dist = dists.create_dist("www.example.com", &cert()).await.unwrap();

        let deployed = dists
            .await_deploy(&dist, &quick_wait(5_000), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(deployed.status, DistributionStatus::Deployed);
        assert_eq!(cdn.polls(&dist.id), 3);
    }

    #[tokio::test]
    async fn test_await_deploy_times_out() {
        let cdn = Arc::new(MemoryCdn::new().deploy_after_polls(usize::MAX));
        let dists = DistributionManager::new(cdn, "us-east-1");
        let dist = dists.create_dist("www.example.com", &cert()).await.unwrap();

        let result = dists
            .await_deploy(&dist, &quick_wait(20), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn test_await_deploy_cancelled() {
        let cdn = Arc::new(MemoryCdn::new().deploy_after_polls(usize::MAX));
        let dists = DistributionManager::new(cdn.clone(), "us-east-1");
        let dist = dists.create_dist("www.example.com", &cert()).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = dists.await_deploy(&dist, &quick_wait(5_000), &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_deploy_wait_from_config() {
        let config = CdnConfig {
            poll_interval_secs: 15,
            deploy_timeout_secs: 600,
        };
        let wait = DeployWait::from(&config);
        assert_eq!(wait.poll_interval, Duration::from_secs(15));
        assert_eq!(wait.timeout, Duration::from_secs(600));
    }
}

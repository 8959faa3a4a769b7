//! CloudFront backend

use crate::backend::{CdnBackend, Distribution, DistributionRequest, DistributionStatus, Page};
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_sdk_cloudfront::{
    types::{
        self as cf, Aliases, CustomOriginConfig, DefaultCacheBehavior, DistributionConfig,
        MinimumProtocolVersion, Origin, OriginProtocolPolicy, Origins, SslSupportMethod,
        ViewerCertificate, ViewerProtocolPolicy,
    },
    Client,
};

/// Managed "CachingOptimized" cache policy
const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// CloudFront CDN backend
pub struct CloudFrontBackend {
    client: Client,
}

impl CloudFrontBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn alias_items(aliases: Option<&Aliases>) -> Vec<String> {
    aliases.map(|a| a.items().to_vec()).unwrap_or_default()
}

fn from_distribution(dist: &cf::Distribution) -> Distribution {
    Distribution {
        id: dist.id().to_string(),
        domain_name: dist.domain_name().to_string(),
        aliases: alias_items(dist.distribution_config().and_then(|c| c.aliases())),
        status: DistributionStatus::parse(dist.status()),
    }
}

fn from_summary(summary: &cf::DistributionSummary) -> Distribution {
    Distribution {
        id: summary.id().to_string(),
        domain_name: summary.domain_name().to_string(),
        aliases: alias_items(summary.aliases()),
        status: DistributionStatus::parse(summary.status()),
    }
}

/// Build the distribution config for a website bucket origin
fn build_config(request: &DistributionRequest) -> Result<DistributionConfig> {
    // Website endpoints only speak HTTP
    let origin = Origin::builder()
        .id(&request.origin_id)
        .domain_name(&request.origin_domain)
        .custom_origin_config(
            CustomOriginConfig::builder()
                .http_port(80)
                .https_port(443)
                .origin_protocol_policy(OriginProtocolPolicy::HttpOnly)
                .build()?,
        )
        .build()?;

    let cache_behavior = DefaultCacheBehavior::builder()
        .target_origin_id(&request.origin_id)
        .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
        .cache_policy_id(CACHING_OPTIMIZED_POLICY_ID)
        .compress(true)
        .build()?;

    let certificate = ViewerCertificate::builder()
        .acm_certificate_arn(&request.certificate_arn)
        .ssl_support_method(SslSupportMethod::SniOnly)
        .minimum_protocol_version(MinimumProtocolVersion::TlSv122021)
        .build();

    let config = DistributionConfig::builder()
        .caller_reference(&request.caller_reference)
        .aliases(Aliases::builder().quantity(1).items(&request.alias).build()?)
        .default_root_object(&request.default_root_object)
        .comment(&request.comment)
        .enabled(true)
        .origins(Origins::builder().quantity(1).items(origin).build()?)
        .default_cache_behavior(cache_behavior)
        .viewer_certificate(certificate)
        .build()?;

    Ok(config)
}

#[async_trait]
impl CdnBackend for CloudFrontBackend {
    async fn list_distributions(&self, marker: Option<String>) -> Result<Page<Distribution>> {
        let response = self
            .client
            .list_distributions()
            .set_marker(marker)
            .send()
            .await?;

        let Some(list) = response.distribution_list() else {
            return Ok(Page::last(Vec::new()));
        };

        let items = list.items().iter().map(from_summary).collect();
        let next = if list.is_truncated() {
            list.next_marker().map(|m| m.to_string())
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn create_distribution(&self, request: &DistributionRequest) -> Result<Distribution> {
        let config = build_config(request)?;

        let response = self
            .client
            .create_distribution()
            .distribution_config(config)
            .send()
            .await?;

        response
            .distribution()
            .map(from_distribution)
            .ok_or_else(|| Error::AwsSdk(format!("CreateDistribution returned nothing for {}", request.alias)))
    }

    async fn get_distribution(&self, id: &str) -> Result<Distribution> {
        let response = self.client.get_distribution().id(id).send().await?;

        response
            .distribution()
            .map(from_distribution)
            .ok_or_else(|| Error::NotFound(format!("Distribution {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DistributionRequest {
        DistributionRequest {
            caller_reference: "ref-1".to_string(),
            alias: "www.example.com".to_string(),
            origin_id: "S3-Website-www.example.com".to_string(),
            origin_domain: "www.example.com.s3-website-us-east-1.amazonaws.com".to_string(),
            default_root_object: "index.html".to_string(),
            certificate_arn: "arn:aws:acm:us-east-1:123:certificate/abc".to_string(),
            comment: "Created by sitepilot".to_string(),
        }
    }

    #[test]
    fn test_build_config() {
        let config = build_config(&request()).unwrap();

        assert_eq!(alias_items(config.aliases()), vec!["www.example.com".to_string()]);

        let cert = config.viewer_certificate().unwrap();
        assert_eq!(cert.acm_certificate_arn(), Some("arn:aws:acm:us-east-1:123:certificate/abc"));
    }
}

//! Route 53 hosted zones and alias records for a site's domain

use crate::backend::{paginate, AliasRecord, AliasTarget, DnsBackend, HostedZone};
use crate::endpoints::{WebsiteEndpoint, CLOUDFRONT_HOSTED_ZONE_ID};
use crate::error::{Error, Result};
use futures::TryStreamExt;
use std::sync::Arc;

/// Comment attached to every change batch
const CHANGE_COMMENT: &str = "Created by sitepilot";

/// Lowercase a domain and drop a trailing dot
pub(crate) fn normalize_domain(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}

/// Zone name for a domain: its last two labels plus the root dot
pub fn zone_name_for(domain: &str) -> Result<String> {
    let domain = normalize_domain(domain);
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(Error::InvalidInput(format!("'{}' is not a valid domain name", domain)));
    }

    Ok(format!("{}.", labels[labels.len() - 2..].join(".")))
}

/// Check if a zone can hold records for a domain.
///
/// The zone name must equal the domain or be a whole-label suffix of it, so
/// `example.com.` serves `www.example.com` but not `badexample.com`.
pub fn zone_serves(zone_name: &str, domain: &str) -> bool {
    let zone = normalize_domain(zone_name);
    let domain = normalize_domain(domain);

    if zone.is_empty() {
        return false;
    }
    domain == zone || domain.ends_with(&format!(".{}", zone))
}

/// Finds or creates hosted zones and points domains at website endpoints
pub struct DomainManager {
    dns: Arc<dyn DnsBackend>,
}

impl DomainManager {
    pub fn new(dns: Arc<dyn DnsBackend>) -> Self {
        Self { dns }
    }

    /// First hosted zone, in listing order, that serves `domain`
    pub async fn find_hosted_zone(&self, domain: &str) -> Result<Option<HostedZone>> {
        let mut zones = paginate(move |marker| self.dns.list_hosted_zones(marker));

        while let Some(zone) = zones.try_next().await? {
            if zone_serves(&zone.name, domain) {
                tracing::debug!("Hosted zone {} ({}) serves {}", zone.name, zone.id, domain);
                return Ok(Some(zone));
            }
        }

        tracing::debug!("No hosted zone serves {}", domain);
        Ok(None)
    }

    /// Create the hosted zone for a domain's last two labels
    pub async fn create_hosted_zone(&self, domain: &str) -> Result<HostedZone> {
        let zone_name = zone_name_for(domain)?;
        let caller_reference = uuid::Uuid::new_v4().to_string();

        let zone = self.dns.create_hosted_zone(&zone_name, &caller_reference).await?;
        tracing::info!("Created hosted zone {} ({})", zone.name, zone.id);
        Ok(zone)
    }

    /// Existing zone for the domain, or a newly created one
    pub async fn find_or_create_hosted_zone(&self, domain: &str) -> Result<HostedZone> {
        match self.find_hosted_zone(domain).await? {
            Some(zone) => Ok(zone),
            None => self.create_hosted_zone(domain).await,
        }
    }

    /// Point `domain` at an S3 website endpoint
    pub async fn create_s3_domain_record(
        &self,
        zone: &HostedZone,
        domain: &str,
        endpoint: &WebsiteEndpoint,
    ) -> Result<AliasRecord> {
        let target = AliasTarget {
            hosted_zone_id: endpoint.zone.to_string(),
            dns_name: endpoint.host.to_string(),
            evaluate_target_health: true,
        };
        self.upsert_alias(zone, domain, target).await
    }

    /// Point `domain` at a CloudFront distribution's edge host
    pub async fn create_cf_domain_record(
        &self,
        zone: &HostedZone,
        domain: &str,
        cdn_domain: &str,
    ) -> Result<AliasRecord> {
        let target = AliasTarget {
            hosted_zone_id: CLOUDFRONT_HOSTED_ZONE_ID.to_string(),
            dns_name: cdn_domain.to_string(),
            evaluate_target_health: false,
        };
        self.upsert_alias(zone, domain, target).await
    }

    async fn upsert_alias(&self, zone: &HostedZone, domain: &str, target: AliasTarget) -> Result<AliasRecord> {
        let record = AliasRecord {
            name: normalize_domain(domain),
            record_type: "A".to_string(),
            target,
        };
        self.dns.upsert_record(&zone.id, &record, CHANGE_COMMENT).await?;
        tracing::info!(
            "Upserted alias {} -> {} in {}",
            record.name,
            record.target.dns_name,
            zone.name
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::get_endpoint;
    use crate::testing::MemoryDns;

    #[test]
    fn test_zone_name_for() {
        assert_eq!(zone_name_for("www.example.com").unwrap(), "example.com.");
        assert_eq!(zone_name_for("example.com").unwrap(), "example.com.");
        assert_eq!(zone_name_for("a.b.example.com.").unwrap(), "example.com.");
        assert_eq!(zone_name_for("WWW.Example.COM").unwrap(), "example.com.");
        assert!(zone_name_for("localhost").is_err());
        assert!(zone_name_for("www..com").is_err());
    }

    #[test]
    fn test_zone_serves() {
        assert!(zone_serves("example.com.", "example.com"));
        assert!(zone_serves("example.com.", "www.example.com"));
        assert!(zone_serves("example.com.", "a.b.example.com"));
        assert!(zone_serves("Example.com.", "www.example.COM."));
        assert!(!zone_serves("example.com.", "badexample.com"));
        assert!(!zone_serves("example.com.", "example.org"));
        assert!(!zone_serves(".", "example.com"));
    }

    #[tokio::test]
    async fn test_find_hosted_zone_across_pages() {
        let dns = Arc::new(
            MemoryDns::new()
                .with_page_size(1)
                .with_zone("/hostedzone/Z1", "other.org.")
                .with_zone("/hostedzone/Z2", "badexample.com.")
                .with_zone("/hostedzone/Z3", "example.com."),
        );
        let domains = DomainManager::new(dns);

        let zone = domains.find_hosted_zone("www.example.com").await.unwrap().unwrap();
        assert_eq!(zone.id, "/hostedzone/Z3");
        assert_eq!(zone.name, "example.com.");
    }

    #[tokio::test]
    async fn test_find_hosted_zone_first_match_wins() {
        let dns = Arc::new(
            MemoryDns::new()
                .with_zone("/hostedzone/Z1", "example.com.")
                .with_zone("/hostedzone/Z2", "blog.example.com."),
        );
        let domains = DomainManager::new(dns);

        let zone = domains.find_hosted_zone("www.blog.example.com").await.unwrap().unwrap();
        assert_eq!(zone.id, "/hostedzone/Z1");
    }

    #[tokio::test]
    async fn test_find_hosted_zone_none() {
        let dns = Arc::new(MemoryDns::new().with_zone("/hostedzone/Z1", "example.org."));
        let domains = DomainManager::new(dns);

        assert!(domains.find_hosted_zone("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_hosted_zone_uses_last_two_labels() {
        let dns = Arc::new(MemoryDns::new());
        let domains = DomainManager::new(dns.clone());

        let zone = domains.create_hosted_zone("www.example.com").await.unwrap();
        assert_eq!(zone.name, "example.com.");

        // Fresh caller reference per call
        domains.create_hosted_zone("example.net").await.unwrap();
        assert_eq!(dns.zones().len(), 2);
    }

    #[tokio::test]
    async fn test_find_or_create_reuses_zone() {
        let dns = Arc::new(MemoryDns::new());
        let domains = DomainManager::new(dns.clone());

        let created = domains.find_or_create_hosted_zone("www.example.com").await.unwrap();
        let found = domains.find_or_create_hosted_zone("blog.example.com").await.unwrap();

        assert_eq!(created, found);
        assert_eq!(dns.zones().len(), 1);
    }

    #[tokio::test]
    async fn test_s3_record_upsert_is_idempotent() {
        let dns = Arc::new(MemoryDns::new().with_zone("/hostedzone/Z1", "example.com."));
        let domains = DomainManager::new(dns.clone());
        let zone = domains.find_hosted_zone("example.com").await.unwrap().unwrap();
        let endpoint = get_endpoint("us-east-1").unwrap();

        domains.create_s3_domain_record(&zone, "example.com", &endpoint).await.unwrap();
        domains.create_s3_domain_record(&zone, "example.com", &endpoint).await.unwrap();

        let records = dns.records("/hostedzone/Z1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type, "A");
        assert_eq!(records[0].target.hosted_zone_id, "Z3AQBSTGFYJSTF");
        assert_eq!(records[0].target.dns_name, "s3-website-us-east-1.amazonaws.com");
        assert!(records[0].target.evaluate_target_health);
    }

    #[tokio::test]
    async fn test_cf_record_replaces_s3_record() {
        let dns = Arc::new(MemoryDns::new().with_zone("/hostedzone/Z1", "example.com."));
        let domains = DomainManager::new(dns.clone());
        let zone = domains.find_hosted_zone("www.example.com").await.unwrap().unwrap();
        let endpoint = get_endpoint("eu-west-1").unwrap();

        domains.create_s3_domain_record(&zone, "www.example.com", &endpoint).await.unwrap();
        domains
            .create_cf_domain_record(&zone, "www.example.com", "d1234.cloudfront.net")
            .await
            .unwrap();

        let records = dns.records("/hostedzone/Z1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "www.example.com");
        assert_eq!(records[0].target.hosted_zone_id, CLOUDFRONT_HOSTED_ZONE_ID);
        assert_eq!(records[0].target.dns_name, "d1234.cloudfront.net");
    }
}

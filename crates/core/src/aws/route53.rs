//! Route 53 backend

use crate::backend::{AliasRecord, DnsBackend, HostedZone, Page};
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_sdk_route53::{
    types::{self as r53, RrType},
    Client,
};

/// Route 53 DNS backend
pub struct Route53Backend {
    client: Client,
}

impl Route53Backend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Route 53 returns ids as `/hostedzone/ID` but accepts the bare id everywhere
fn bare_zone_id(id: &str) -> &str {
    id.trim_start_matches("/hostedzone/")
}

fn to_zone(zone: &r53::HostedZone) -> HostedZone {
    HostedZone {
        id: zone.id().to_string(),
        name: zone.name().to_string(),
    }
}

#[async_trait]
impl DnsBackend for Route53Backend {
    async fn list_hosted_zones(&self, marker: Option<String>) -> Result<Page<HostedZone>> {
        let response = self
            .client
            .list_hosted_zones()
            .set_marker(marker)
            .send()
            .await?;

        let items = response.hosted_zones().iter().map(to_zone).collect();
        let next = if response.is_truncated() {
            response.next_marker().map(|m| m.to_string())
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn create_hosted_zone(&self, name: &str, caller_reference: &str) -> Result<HostedZone> {
        let response = self
            .client
            .create_hosted_zone()
            .name(name)
            .caller_reference(caller_reference)
            .send()
            .await?;

        response
            .hosted_zone()
            .map(to_zone)
            .ok_or_else(|| Error::AwsSdk(format!("CreateHostedZone returned no zone for {}", name)))
    }

    async fn upsert_record(&self, zone_id: &str, record: &AliasRecord, comment: &str) -> Result<()> {
        let alias = r53::AliasTarget::builder()
            .hosted_zone_id(&record.target.hosted_zone_id)
            .dns_name(&record.target.dns_name)
            .evaluate_target_health(record.target.evaluate_target_health)
            .build()?;

        let record_set = r53::ResourceRecordSet::builder()
            .name(&record.name)
            .r#type(RrType::from(record.record_type.as_str()))
            .alias_target(alias)
            .build()?;

        let batch = r53::ChangeBatch::builder()
            .comment(comment)
            .changes(
                r53::Change::builder()
                    .action(r53::ChangeAction::Upsert)
                    .resource_record_set(record_set)
                    .build()?,
            )
            .build()?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(bare_zone_id(zone_id))
            .change_batch(batch)
            .send()
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_zone_id() {
        assert_eq!(bare_zone_id("/hostedzone/Z123"), "Z123");
        assert_eq!(bare_zone_id("Z123"), "Z123");
    }
}

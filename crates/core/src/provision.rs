//! CDN setup as an explicit sequence of states.
//!
//! ```text
//! FindDistribution --found--> ResolveZone
//!        |
//!        v
//! FindCertificate --none--> MissingCertificate
//!        |
//!        v
//! CreateDistribution -> AwaitDeploy -> ResolveZone -> UpsertRecord -> Live
//! ```
//!
//! Each call to [`CdnSetup::step`] performs one transition. A failed step
//! leaves the state untouched so the caller can retry it.

use crate::backend::{AliasRecord, Certificate, Distribution, HostedZone};
use crate::context::Context;
use crate::domain::normalize_domain;
use crate::error::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Result of a completed CDN setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnOutcome {
    pub distribution: Distribution,
    pub zone: HostedZone,
    pub record: AliasRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdnState {
    FindDistribution,
    FindCertificate,
    CreateDistribution(Certificate),
    AwaitDeploy(Distribution),
    ResolveZone(Distribution),
    UpsertRecord {
        distribution: Distribution,
        zone: HostedZone,
    },
    Live(CdnOutcome),
    MissingCertificate,
}

impl CdnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CdnState::Live(_) | CdnState::MissingCertificate)
    }
}

/// Puts a CloudFront distribution with TLS in front of a website bucket
/// and points the domain at it
pub struct CdnSetup<'a> {
    ctx: &'a Context,
    domain: String,
    bucket: String,
    cancel: CancellationToken,
    state: CdnState,
}

impl<'a> CdnSetup<'a> {
    pub fn new(ctx: &'a Context, domain: &str, bucket: &str) -> Self {
        Self {
            ctx,
            domain: normalize_domain(domain),
            bucket: bucket.to_string(),
            cancel: CancellationToken::new(),
            state: CdnState::FindDistribution,
        }
    }

    /// Token that aborts the deploy wait when cancelled
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn state(&self) -> &CdnState {
        &self.state
    }

    /// Perform one transition and return the new state
    pub async fn step(&mut self) -> Result<&CdnState> {
        let ctx = self.ctx;
        let next = match &self.state {
            CdnState::FindDistribution => {
                match ctx.distributions.find_matching_dist(&self.domain).await? {
                    Some(dist) => CdnState::ResolveZone(dist),
                    None => CdnState::FindCertificate,
                }
            }
            CdnState::FindCertificate => {
                match ctx.certificates.find_matching_cert(&self.domain).await? {
                    Some(cert) => CdnState::CreateDistribution(cert),
                    None => CdnState::MissingCertificate,
                }
            }
            CdnState::CreateDistribution(cert) => {
                let endpoint = ctx.buckets.get_bucket_endpoint(&self.bucket).await?;
                let dist = ctx
                    .distributions
                    .create_dist_for_bucket(&self.domain, &self.bucket, &endpoint, cert)
                    .await?;
                CdnState::AwaitDeploy(dist)
            }
            CdnState::AwaitDeploy(dist) => {
                let dist = ctx
                    .distributions
                    .await_deploy(dist, &ctx.deploy_wait, &self.cancel)
                    .await?;
                CdnState::ResolveZone(dist)
            }
            CdnState::ResolveZone(dist) => {
                let zone = ctx.domains.find_or_create_hosted_zone(&self.domain).await?;
                CdnState::UpsertRecord {
                    distribution: dist.clone(),
                    zone,
                }
            }
            CdnState::UpsertRecord { distribution, zone } => {
                let record = ctx
                    .domains
                    .create_cf_domain_record(zone, &self.domain, &distribution.domain_name)
                    .await?;
                CdnState::Live(CdnOutcome {
                    distribution: distribution.clone(),
                    zone: zone.clone(),
                    record,
                })
            }
            CdnState::Live(_) | CdnState::MissingCertificate => return Ok(&self.state),
        };

        tracing::debug!("CDN setup for {}: {:?}", self.domain, next);
        self.state = next;
        Ok(&self.state)
    }

    /// Step until the setup is live or stops for lack of a certificate
    pub async fn run(mut self) -> Result<CdnOutcome> {
        loop {
            self.step().await?;
            match &self.state {
                CdnState::Live(outcome) => return Ok(outcome.clone()),
                CdnState::MissingCertificate => {
                    return Err(Error::MissingCertificate(self.domain.clone()))
                }
                _ => {}
            }
        }
    }
}

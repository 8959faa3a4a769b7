//! Locate an issued ACM certificate covering a domain

use crate::backend::{paginate, Certificate, CertificateBackend};
use crate::domain::normalize_domain;
use crate::error::Result;
use futures::TryStreamExt;
use std::sync::Arc;

/// Check if one subject alternative name covers `domain`.
///
/// A wildcard covers exactly one extra label: `*.example.com` matches
/// `www.example.com`, not `example.com` or `a.b.example.com`.
pub fn name_matches(name: &str, domain: &str) -> bool {
    let name = normalize_domain(name);
    let domain = normalize_domain(domain);

    match name.strip_prefix("*.") {
        Some(suffix) => domain
            .strip_suffix(suffix)
            .and_then(|rest| rest.strip_suffix('.'))
            .map(|label| !label.is_empty() && !label.contains('.'))
            .unwrap_or(false),
        None => name == domain,
    }
}

/// Check if any of the certificate's names covers `domain`
pub fn cert_matches(cert: &Certificate, domain: &str) -> bool {
    cert.subject_alternative_names
        .iter()
        .any(|name| name_matches(name, domain))
}

/// Searches the certificate inventory
pub struct CertificateManager {
    certificates: Arc<dyn CertificateBackend>,
}

impl CertificateManager {
    pub fn new(certificates: Arc<dyn CertificateBackend>) -> Self {
        Self { certificates }
    }

    /// First issued certificate whose names cover `domain`
    pub async fn find_matching_cert(&self, domain: &str) -> Result<Option<Certificate>> {
        let mut summaries = paginate(move |token| self.certificates.list_issued_certificates(token));

        while let Some(summary) = summaries.try_next().await? {
            let cert = self.certificates.describe_certificate(&summary.arn).await?;
            if cert_matches(&cert, domain) {
                tracing::debug!("Certificate {} covers {}", cert.arn, domain);
                return Ok(Some(cert));
            }
        }

        tracing::debug!("No issued certificate covers {}", domain);
        Ok(None)
    }
}

//! ACM backend

use crate::backend::{Certificate, CertificateBackend, CertificateSummary, Page};
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_sdk_acm::{types::CertificateStatus, Client};

/// ACM certificate backend
pub struct AcmBackend {
    client: Client,
}

impl AcmBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CertificateBackend for AcmBackend {
    async fn list_issued_certificates(&self, token: Option<String>) -> Result<Page<CertificateSummary>> {
        let response = self
            .client
            .list_certificates()
            .certificate_statuses(CertificateStatus::Issued)
            .set_next_token(token)
            .send()
            .await?;

        let items = response
            .certificate_summary_list()
            .iter()
            .filter_map(|c| {
                c.certificate_arn().map(|arn| CertificateSummary {
                    arn: arn.to_string(),
                })
            })
            .collect();

        Ok(Page {
            items,
            next: response.next_token().map(|t| t.to_string()),
        })
    }

    async fn describe_certificate(&self, arn: &str) -> Result<Certificate> {
        let response = self
            .client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await?;

        let detail = response
            .certificate()
            .ok_or_else(|| Error::NotFound(format!("Certificate {}", arn)))?;

        Ok(Certificate {
            arn: arn.to_string(),
            status: detail.status().map(|s| s.as_str().to_string()),
            subject_alternative_names: detail.subject_alternative_names().to_vec(),
        })
    }
}

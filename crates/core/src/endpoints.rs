//! S3 website endpoints and their Route 53 hosted zones
//!
//! Alias records need both the endpoint host and the hosted zone id AWS
//! publishes for it. Older regions use the dashed `s3-website-<region>` form,
//! newer ones the dotted `s3-website.<region>` form.

use crate::error::{Error, Result};

/// Hosted zone id shared by every CloudFront distribution
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Static website endpoint of one region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebsiteEndpoint {
    pub region: &'static str,
    pub host: &'static str,
    pub zone: &'static str,
}

impl WebsiteEndpoint {
    /// Website host name for a bucket in this region
    pub fn bucket_host(&self, bucket: &str) -> String {
        format!("{}.{}", bucket, self.host)
    }

    /// Public website URL for a bucket in this region
    pub fn bucket_url(&self, bucket: &str) -> String {
        format!("http://{}", self.bucket_host(bucket))
    }
}

const ENDPOINTS: &[WebsiteEndpoint] = &[
    WebsiteEndpoint { region: "us-east-1", host: "s3-website-us-east-1.amazonaws.com", zone: "Z3AQBSTGFYJSTF" },
    WebsiteEndpoint { region: "us-east-2", host: "s3-website.us-east-2.amazonaws.com", zone: "Z2O1EMRO9K5GLX" },
    WebsiteEndpoint { region: "us-west-1", host: "s3-website-us-west-1.amazonaws.com", zone: "Z2F56UZL2M1ACD" },
    WebsiteEndpoint { region: "us-west-2", host: "s3-website-us-west-2.amazonaws.com", zone: "Z3BJ6K6RIION7M" },
    WebsiteEndpoint { region: "ca-central-1", host: "s3-website.ca-central-1.amazonaws.com", zone: "Z1QDHH18159H29" },
    WebsiteEndpoint { region: "ap-south-1", host: "s3-website.ap-south-1.amazonaws.com", zone: "Z11RGJOFQNVJUP" },
    WebsiteEndpoint { region: "ap-northeast-1", host: "s3-website-ap-northeast-1.amazonaws.com", zone: "Z2M4EHUR26P7ZW" },
    WebsiteEndpoint { region: "ap-northeast-2", host: "s3-website.ap-northeast-2.amazonaws.com", zone: "Z3W03O7B5YMIYP" },
    WebsiteEndpoint { region: "ap-northeast-3", host: "s3-website.ap-northeast-3.amazonaws.com", zone: "Z2YQB5RD63NC85" },
    WebsiteEndpoint { region: "ap-southeast-1", host: "s3-website-ap-southeast-1.amazonaws.com", zone: "Z3O0J2DXBE1FTB" },
    WebsiteEndpoint { region: "ap-southeast-2", host: "s3-website-ap-southeast-2.amazonaws.com", zone: "Z1WCIGYICN2BYD" },
    WebsiteEndpoint { region: "eu-central-1", host: "s3-website.eu-central-1.amazonaws.com", zone: "Z21DNDUVLTQW6Q" },
    WebsiteEndpoint { region: "eu-west-1", host: "s3-website-eu-west-1.amazonaws.com", zone: "Z1BKCTXD74EZPE" },
    WebsiteEndpoint { region: "eu-west-2", host: "s3-website.eu-west-2.amazonaws.com", zone: "Z3GKZC51ZF0DB4" },
    WebsiteEndpoint { region: "eu-west-3", host: "s3-website.eu-west-3.amazonaws.com", zone: "Z3R1K369G5AVDG" },
    WebsiteEndpoint { region: "eu-north-1", host: "s3-website.eu-north-1.amazonaws.com", zone: "Z3BAZG2TWCNX0D" },
    WebsiteEndpoint { region: "sa-east-1", host: "s3-website-sa-east-1.amazonaws.com", zone: "Z7KQH4QJS55SO" },
];

/// Look up the website endpoint of a region
pub fn get_endpoint(region: &str) -> Result<WebsiteEndpoint> {
    ENDPOINTS
        .iter()
        .find(|e| e.region == region)
        .copied()
        .ok_or_else(|| {
            Error::NotFound(format!("No S3 website endpoint known for region '{}'", region))
        })
}

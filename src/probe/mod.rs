pub mod geo;
pub mod html;
mod network;
pub mod whois;

use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use x509_parser::parse_x509_certificate;

pub use network::{NetworkProbe, USER_AGENT};
pub use whois::WhoisRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedPage {
    /// Where the redirect chain ended.
    pub final_url: String,
    #[serde(skip_serializing)]
    pub text: String,
}

/// The leaf certificate a server presented. Names and validity are absent
/// when the DER does not parse as X.509.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsCertificate {
    pub sha256_fingerprint: String,
    pub der_len: usize,
    pub subject: Option<String>,
    pub issuer: Option<String>,
    pub not_before: Option<String>,
    pub not_after: Option<String>,
}

impl TlsCertificate {
    pub fn from_der(der: &[u8]) -> Self {
        let digest = Sha256::digest(der);
        let sha256_fingerprint = digest
            .iter()
            .map(|byte| format!("{:02X}", byte))
            .collect::<Vec<_>>()
            .join(":");

        let mut cert = Self {
            sha256_fingerprint,
            der_len: der.len(),
            subject: None,
            issuer: None,
            not_before: None,
            not_after: None,
        };

        if let Ok((_, parsed)) = parse_x509_certificate(der) {
            cert.subject = Some(parsed.subject().to_string());
            cert.issuer = Some(parsed.issuer().to_string());
            cert.not_before = Some(parsed.validity().not_before.to_string());
            cert.not_after = Some(parsed.validity().not_after.to_string());
        }

        cert
    }

    /// Same leaf certificate, regardless of how much of it was parsed.
    pub fn same_as(&self, other: &TlsCertificate) -> bool {
        self.sha256_fingerprint == other.sha256_fingerprint
    }
}

impl fmt::Display for TlsCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = "unknown";
        write!(
            f,
            "subject={}, issuer={}, valid={} to {}, sha256={}",
            self.subject.as_deref().unwrap_or(unknown),
            self.issuer.as_deref().unwrap_or(unknown),
            self.not_before.as_deref().unwrap_or(unknown),
            self.not_after.as_deref().unwrap_or(unknown),
            self.sha256_fingerprint
        )
    }
}

/// Everything observed about one domain. A `None` field means the probe
/// failed or timed out, not that the value is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub ip: Option<IpAddr>,
    pub country: Option<String>,
    pub page: Option<FetchedPage>,
    pub whois: Option<WhoisRecord>,
    pub tls: Option<TlsCertificate>,
    pub mx: Vec<String>,
}

/// Network observations used by the classifier. Implementations never return
/// errors: every failure collapses to `None` or an empty list.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn resolve(&self, domain: &str) -> Option<IpAddr>;

    async fn fetch_content(&self, url: &str) -> Option<FetchedPage>;

    async fn whois(&self, domain: &str) -> Option<WhoisRecord>;

    async fn tls_certificate(&self, domain: &str) -> Option<TlsCertificate>;

    async fn mx_records(&self, domain: &str) -> Vec<String>;

    async fn geolocate(&self, ip: IpAddr) -> Option<String>;
}

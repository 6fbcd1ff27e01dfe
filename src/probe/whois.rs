use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const WHOIS_PORT: u16 = 43;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WhoisRecord {
    pub server: String,
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub expiry_date: Option<String>,
    pub registrant: Option<String>,
    pub name_servers: Vec<String>,
}

impl fmt::Display for WhoisRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = "unknown";
        write!(
            f,
            "registrar={}, created={}, expires={}, registrant={}, name_servers=[{}]",
            self.registrar.as_deref().unwrap_or(unknown),
            self.creation_date.as_deref().unwrap_or(unknown),
            self.expiry_date.as_deref().unwrap_or(unknown),
            self.registrant.as_deref().unwrap_or(unknown),
            self.name_servers.join(", ")
        )
    }
}

const IANA_SERVER: &str = "whois.iana.org";

/// Queries the registry WHOIS server for the domain's TLD and follows one
/// referral to the registrar's server when the registry names one.
pub async fn lookup(domain: &str, per_query: Duration) -> Result<WhoisRecord> {
    let tld = domain.rsplit('.').next().unwrap_or("");
    let server = get_whois_server(tld);
    lookup_at(server, server != IANA_SERVER, domain, per_query).await
}

// The IANA root answers describe the TLD, so they are only good for the
// referral they carry and never stand in for the domain's own record.
async fn lookup_at(server: &str, describes_domain: bool, domain: &str, per_query: Duration) -> Result<WhoisRecord> {
    let response = query(server, domain, per_query).await?;
    let registry_record = if describes_domain {
        parse_record(server, &response)
    } else {
        None
    };

    if let Some(referral) = referral_server(&response).filter(|referral| referral != server) {
        match query(&referral, domain, per_query).await {
            Ok(referred) => {
                if is_not_found(&referred) {
                    bail!("{domain} is not registered according to {referral}");
                }
                if let Some(record) = parse_record(&referral, &referred) {
                    return Ok(merge(record, registry_record));
                }
            }
            Err(err) => debug!(%domain, server = %referral, error = %err, "whois referral failed"),
        }
    }

    registry_record.ok_or_else(|| anyhow!("no whois record for {domain}"))
}

async fn query(server: &str, domain: &str, per_query: Duration) -> Result<String> {
    let address = if server.contains(':') {
        server.to_string()
    } else {
        format!("{server}:{WHOIS_PORT}")
    };

    let mut stream = timeout(per_query, TcpStream::connect(&address)).await??;

    let query = format!("{}\r\n", domain);
    timeout(per_query, stream.write_all(query.as_bytes())).await??;

    let mut response = Vec::new();
    timeout(per_query, stream.read_to_end(&mut response)).await??;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

fn get_whois_server(tld: &str) -> &'static str {
    match tld {
        "com" | "net" => "whois.verisign-grs.com",
        "org" => "whois.pir.org",
        "info" => "whois.afilias.net",
        "biz" => "whois.neulevel.biz",
        "us" => "whois.nic.us",
        "co" => "whois.nic.co",
        "io" => "whois.nic.io",
        "me" => "whois.nic.me",
        "uk" => "whois.nic.uk",
        "ca" => "whois.cira.ca",
        "de" => "whois.denic.de",
        "fr" => "whois.afnic.fr",
        "ru" => "whois.tcinet.ru",
        "cn" => "whois.cnnic.net.cn",
        "jp" => "whois.jprs.jp",
        "au" => "whois.auda.org.au",
        "br" => "whois.registro.br",
        "app" | "dev" => "whois.nic.google",
        "tech" => "whois.nic.tech",
        _ => "whois.iana.org",
    }
}

fn is_not_found(response: &str) -> bool {
    let lower = response.to_lowercase();
    [
        "no match",
        "not found",
        "no entries found",
        "domain status: available",
        "no data found",
        "status: free",
    ]
    .iter()
    .any(|marker| lower.contains(marker))
}

fn fields<'a>(response: &'a str) -> impl Iterator<Item = (String, &'a str)> + 'a {
    response.lines().filter_map(|line| {
        let line = line.trim();
        if line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>") {
            return None;
        }
        let (key, value) = line.split_once(':')?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some((key.trim().to_lowercase(), value))
    })
}

/// Host named by a `refer:`, `whois:` or `Registrar WHOIS Server:` line.
pub fn referral_server(response: &str) -> Option<String> {
    fields(response)
        .find(|(key, _)| matches!(key.as_str(), "refer" | "whois" | "registrar whois server"))
        .map(|(_, value)| {
            let host = value
                .trim_start_matches("whois://")
                .trim_start_matches("https://")
                .trim_start_matches("http://");
            host.trim_end_matches('/').to_lowercase()
        })
        .filter(|host| !host.is_empty())
}

pub fn parse_record(server: &str, response: &str) -> Option<WhoisRecord> {
    if response.trim().is_empty() || is_not_found(response) {
        return None;
    }

    let mut record = WhoisRecord {
        server: server.to_string(),
        ..WhoisRecord::default()
    };

    for (key, value) in fields(response) {
        let slot = match key.as_str() {
            "registrar" | "sponsoring registrar" => &mut record.registrar,
            "creation date" | "created" | "registered on" | "registration time" => &mut record.creation_date,
            "registry expiry date"
            | "registrar registration expiration date"
            | "expiration date"
            | "expiry date"
            | "paid-till" => &mut record.expiry_date,
            "registrant organization" | "registrant organisation" | "registrant" => &mut record.registrant,
            "name server" | "nserver" => {
                let host = value.split_whitespace().next().unwrap_or(value).to_lowercase();
                if !record.name_servers.contains(&host) {
                    record.name_servers.push(host);
                }
                continue;
            }
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    Some(record)
}

// Registrar answers are more detailed; the registry fills what they leave out.
fn merge(mut preferred: WhoisRecord, fallback: Option<WhoisRecord>) -> WhoisRecord {
    if let Some(fallback) = fallback {
        preferred.registrar = preferred.registrar.or(fallback.registrar);
        preferred.creation_date = preferred.creation_date.or(fallback.creation_date);
        preferred.expiry_date = preferred.expiry_date.or(fallback.expiry_date);
        preferred.registrant = preferred.registrant.or(fallback.registrant);
        if preferred.name_servers.is_empty() {
            preferred.name_servers = fallback.name_servers;
        }
    }
    preferred
}

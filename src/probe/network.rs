use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::tls::TlsInfo;
use tokio::time::timeout;
use tracing::debug;
use trust_dns_resolver::config::*;
use trust_dns_resolver::TokioAsyncResolver;

use super::{geo, html, whois, FetchedPage, Probe, TlsCertificate, WhoisRecord};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Probes backed by the real network: reqwest for HTTP and TLS, the system's
/// default upstream resolvers for DNS, and raw port-43 WHOIS.
pub struct NetworkProbe {
    client: reqwest::Client,
    tls_client: reqwest::Client,
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl NetworkProbe {
    pub fn new(probe_timeout: Duration) -> Result<Self> {
        // Certificate validation is off so misconfigured and self-signed
        // lookalikes are still observed.
        let client = reqwest::Client::builder()
            .timeout(probe_timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()
            .context("failed to build HTTP client")?;

        let tls_client = reqwest::Client::builder()
            .timeout(probe_timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .tls_info(true)
            .redirect(Policy::none())
            .build()
            .context("failed to build TLS client")?;

        let mut opts = ResolverOpts::default();
        opts.timeout = probe_timeout;
        opts.attempts = 1;
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

        Ok(Self {
            client,
            tls_client,
            resolver,
            timeout: probe_timeout,
        })
    }

    async fn bounded<T>(
        &self,
        probe: &'static str,
        subject: &str,
        limit: Duration,
        fut: impl Future<Output = Result<T>>,
    ) -> Option<T> {
        match timeout(limit, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                debug!(probe, %subject, error = %format!("{err:#}"), "probe failed");
                None
            }
            Err(_) => {
                debug!(probe, %subject, "probe timed out");
                None
            }
        }
    }

    async fn try_resolve(&self, domain: &str) -> Result<IpAddr> {
        let lookup = self.resolver.lookup_ip(domain).await?;
        let addresses: Vec<IpAddr> = lookup.iter().collect();

        addresses
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
            .ok_or_else(|| anyhow!("no address records"))
    }

    async fn try_fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            bail!("unexpected status {status}");
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(FetchedPage {
            final_url,
            text: html::visible_text(&body),
        })
    }

    async fn try_tls_certificate(&self, domain: &str) -> Result<TlsCertificate> {
        let response = self.tls_client.get(format!("https://{}", domain)).send().await?;

        let der = response
            .extensions()
            .get::<TlsInfo>()
            .and_then(TlsInfo::peer_certificate)
            .context("no peer certificate")?;

        Ok(TlsCertificate::from_der(der))
    }

    async fn try_mx_records(&self, domain: &str) -> Result<Vec<String>> {
        let lookup = self.resolver.mx_lookup(domain).await?;
        Ok(lookup.iter().map(|mx| mx.exchange().to_string()).collect())
    }

    async fn try_geolocate(&self, ip: IpAddr) -> Result<String> {
        let lookup = self.resolver.txt_lookup(geo::cymru_query_name(ip)).await?;

        for txt in lookup.iter() {
            let answer: String = txt.iter().map(|data| String::from_utf8_lossy(data)).collect();
            if let Some(code) = geo::parse_cymru_txt(&answer) {
                return Ok(geo::country_name(&code));
            }
        }

        bail!("no country in ASN answer")
    }
}

#[async_trait]
impl Probe for NetworkProbe {
    async fn resolve(&self, domain: &str) -> Option<IpAddr> {
        self.bounded("dns", domain, self.timeout, self.try_resolve(domain))
            .await
    }

    async fn fetch_content(&self, url: &str) -> Option<FetchedPage> {
        self.bounded("http", url, self.timeout, self.try_fetch(url)).await
    }

    async fn whois(&self, domain: &str) -> Option<WhoisRecord> {
        // Registry answer plus one referral.
        self.bounded("whois", domain, self.timeout * 2, whois::lookup(domain, self.timeout))
            .await
    }

    async fn tls_certificate(&self, domain: &str) -> Option<TlsCertificate> {
        self.bounded("tls", domain, self.timeout, self.try_tls_certificate(domain))
            .await
    }

    async fn mx_records(&self, domain: &str) -> Vec<String> {
        self.bounded("mx", domain, self.timeout, self.try_mx_records(domain))
            .await
            .unwrap_or_default()
    }

    async fn geolocate(&self, ip: IpAddr) -> Option<String> {
        let subject = ip.to_string();
        self.bounded("geolocation", &subject, self.timeout, self.try_geolocate(ip))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn respond(path: &str) -> String {
        let (status, extra, body) = match path {
            "/" => ("302 Found", "Location: /home\r\n", ""),
            "/home" => (
                "200 OK",
                "",
                "<html><head><style>p { color: red }</style></head>\
                 <body><p>Hello <b>world</b></p><script>track()</script></body></html>",
            ),
            _ => ("404 Not Found", "", "<html><body>missing</body></html>"),
        };
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n{extra}\r\n{body}",
            body.len()
        )
    }

    async fn handle(mut stream: TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let request = String::from_utf8_lossy(&request);
        let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
        let _ = stream.write_all(respond(&path).as_bytes()).await;
    }

    async fn serve() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle(stream));
            }
        });
        format!("http://{}", addr)
    }

    // Accepts connections and never answers.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        format!("http://{}", addr)
    }

    fn network_probe() -> NetworkProbe {
        NetworkProbe::new(Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn fetch_follows_redirects_and_keeps_visible_text() {
        let base = serve().await;

        let page = network_probe().fetch_content(&base).await.unwrap();

        assert_eq!(page.final_url, format!("{}/home", base));
        assert_eq!(page.text, "Hello world");
    }

    #[tokio::test]
    async fn non_success_status_is_absent() {
        let base = serve().await;
        assert_eq!(network_probe().fetch_content(&format!("{}/gone", base)).await, None);
    }

    #[tokio::test]
    async fn unanswered_fetch_times_out_as_absent() {
        let base = serve_silence().await;

        let started = std::time::Instant::now();
        let page = network_probe().fetch_content(&base).await;

        assert_eq!(page, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn refused_connection_is_absent() {
        assert_eq!(network_probe().fetch_content("http://127.0.0.1:1").await, None);
    }
}

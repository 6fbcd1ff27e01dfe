use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::generator::Candidate;
use crate::probe::{FetchedPage, Probe, ProbeResult, TlsCertificate, WhoisRecord};
use crate::similarity::Scorer;

pub const DEFAULT_THRESHOLD: f64 = 70.0;
pub const DEFAULT_CONCURRENCY: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Similarity percentage a candidate must strictly exceed to be flagged.
    pub threshold: f64,
    pub concurrency: usize,
    pub run_timeout: Option<Duration>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            concurrency: DEFAULT_CONCURRENCY,
            run_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The candidate redirects to the original site; treated as benign.
    DefensiveRedirect,
    LikelyImpersonation,
    NotSimilar,
    /// The candidate's page could not be fetched, so nothing was scored.
    ProbeFailed,
}

impl Verdict {
    pub fn is_inconclusive(self) -> bool {
        matches!(self, Verdict::NotSimilar | Verdict::ProbeFailed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub candidate: Candidate,
    pub verdict: Verdict,
    pub score: Option<f64>,
    pub redirect_target: Option<String>,
    pub probe: ProbeResult,
}

/// Observations of the original domain every candidate is compared against.
#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub domain: Domain,
    pub page: FetchedPage,
    pub ip: IpAddr,
    pub country: Option<String>,
    pub whois: Option<WhoisRecord>,
    pub tls: Option<TlsCertificate>,
    pub mx: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub generated: usize,
    pub checked: usize,
    pub defensive_redirects: usize,
    pub likely_impersonations: usize,
    pub not_similar: usize,
    pub probe_failures: usize,
    pub interrupted: bool,
}

impl RunSummary {
    fn new(generated: usize) -> Self {
        Self {
            generated,
            ..Self::default()
        }
    }

    fn record(&mut self, finding: &Finding) {
        self.checked += 1;
        match finding.verdict {
            Verdict::DefensiveRedirect => self.defensive_redirects += 1,
            Verdict::LikelyImpersonation => self.likely_impersonations += 1,
            Verdict::NotSimilar => self.not_similar += 1,
            Verdict::ProbeFailed => self.probe_failures += 1,
        }
    }

    pub fn unchecked(&self) -> usize {
        self.generated - self.checked
    }
}

pub fn is_defensive_redirect(original: &str, final_url: &str) -> bool {
    final_url.contains(original)
}

pub fn exceeds_threshold(score: f64, threshold: f64) -> bool {
    score > threshold
}

/// The `http://` URL for a candidate, or `None` when the candidate does not
/// parse as a bare host. `am@zon.com` would otherwise be read as user `am`
/// at `zon.com`.
pub fn candidate_url(domain: &str) -> Option<String> {
    let url = format!("http://{}", domain);
    let parsed = Url::parse(&url).ok()?;
    let bare_host = parsed.host_str().is_some()
        && parsed.username().is_empty()
        && parsed.password().is_none()
        && parsed.port().is_none()
        && parsed.path() == "/"
        && parsed.query().is_none()
        && parsed.fragment().is_none();
    bare_host.then_some(url)
}

// The final URL when it differs from the URL that was requested.
fn redirect_target(requested: &str, final_url: &str) -> Option<String> {
    let moved = match (Url::parse(requested), Url::parse(final_url)) {
        (Ok(requested), Ok(landed)) => requested != landed,
        _ => requested != final_url,
    };
    moved.then(|| final_url.to_string())
}

pub struct Classifier {
    config: ClassifierConfig,
    probe: Arc<dyn Probe>,
    scorer: Arc<dyn Scorer>,
}

impl Classifier {
    pub fn new(config: ClassifierConfig, probe: Arc<dyn Probe>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            config,
            probe,
            scorer,
        }
    }

    /// Fetches the original site over http, then https, and resolves it.
    /// Either failing means there is nothing to compare against.
    pub async fn baseline(&self, domain: &Domain) -> Result<Baseline> {
        let name = domain.to_string();

        let mut page = None;
        for protocol in ["http", "https"] {
            let url = format!("{}://{}", protocol, name);
            info!(%url, "fetching baseline content");
            page = self.probe.fetch_content(&url).await;
            if page.is_some() {
                break;
            }
        }
        let page = page.ok_or_else(|| Error::BaselineContent(name.clone()))?;

        let ip = self
            .probe
            .resolve(&name)
            .await
            .ok_or_else(|| Error::BaselineAddress(name.clone()))?;

        let (country, whois, tls, mx) = tokio::join!(
            self.probe.geolocate(ip),
            self.probe.whois(&name),
            self.probe.tls_certificate(&name),
            self.probe.mx_records(&name),
        );

        Ok(Baseline {
            domain: domain.clone(),
            page,
            ip,
            country,
            whois,
            tls,
            mx,
        })
    }

    /// Runs the per-candidate pipeline. Candidates are only ever probed over
    /// plain http, unlike the baseline.
    pub async fn classify(&self, baseline: &Baseline, candidate: Candidate) -> Finding {
        let original = baseline.domain.to_string();
        let Some(url) = candidate_url(&candidate.domain) else {
            debug!(domain = %candidate.domain, family = %candidate.family, "not a hostname, skipping");
            return Finding {
                candidate,
                verdict: Verdict::ProbeFailed,
                score: None,
                redirect_target: None,
                probe: ProbeResult::default(),
            };
        };
        debug!(%url, family = %candidate.family, "checking candidate");

        let page = self.probe.fetch_content(&url).await;

        if let Some(page) = page.as_ref() {
            if is_defensive_redirect(&original, &page.final_url) {
                return Finding {
                    redirect_target: Some(page.final_url.clone()),
                    verdict: Verdict::DefensiveRedirect,
                    score: None,
                    probe: ProbeResult {
                        page: Some(page.clone()),
                        ..ProbeResult::default()
                    },
                    candidate,
                };
            }
        }

        let domain = candidate.domain.as_str();
        let (ip, whois, tls, mx) = tokio::join!(
            self.probe.resolve(domain),
            self.probe.whois(domain),
            self.probe.tls_certificate(domain),
            self.probe.mx_records(domain),
        );
        let country = match ip {
            Some(ip) => self.probe.geolocate(ip).await,
            None => None,
        };

        let (verdict, score, redirect) = match page.as_ref() {
            None => (Verdict::ProbeFailed, None, None),
            Some(page) => {
                let score = self.scorer.score(&baseline.page.text, &page.text);
                let verdict = if exceeds_threshold(score, self.config.threshold) {
                    Verdict::LikelyImpersonation
                } else {
                    Verdict::NotSimilar
                };
                (verdict, Some(score), redirect_target(&url, &page.final_url))
            }
        };

        Finding {
            candidate,
            verdict,
            score,
            redirect_target: redirect,
            probe: ProbeResult {
                ip,
                country,
                page,
                whois,
                tls,
                mx,
            },
        }
    }

    /// Classifies every candidate on a bounded pool and hands each finding to
    /// `on_finding` as it completes, from this task only. Stops early when the
    /// configured run timeout elapses or `shutdown` resolves; dropping the
    /// pool cancels the probes still in flight.
    pub async fn run<F>(
        &self,
        baseline: &Baseline,
        candidates: Vec<Candidate>,
        shutdown: impl Future<Output = ()>,
        mut on_finding: F,
    ) -> RunSummary
    where
        F: FnMut(Finding),
    {
        let mut summary = RunSummary::new(candidates.len());

        let deadline = async {
            match self.config.run_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut findings = stream::iter(candidates)
            .map(|candidate| self.classify(baseline, candidate))
            .buffer_unordered(self.config.concurrency.max(1));

        loop {
            tokio::select! {
                next = findings.next() => match next {
                    Some(finding) => {
                        summary.record(&finding);
                        on_finding(finding);
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    debug!(unchecked = summary.unchecked(), "run timeout reached, stopping");
                    summary.interrupted = true;
                    break;
                }
                _ = &mut shutdown => {
                    debug!(unchecked = summary.unchecked(), "interrupted, stopping");
                    summary.interrupted = true;
                    break;
                }
            }
        }

        summary
    }
}

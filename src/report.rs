use colored::*;
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::warn;

use crate::classifier::{Baseline, Finding, RunSummary, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Colored, line-oriented output for people
    #[default]
    Text,
    /// One JSON object per finding per line, then a summary object
    Json,
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    summary: &'a RunSummary,
}

/// The single writer for run output. Lines are written between progress bar
/// redraws so they never interleave with it.
pub struct Reporter {
    verbose: bool,
    format: OutputFormat,
    progress: ProgressBar,
}

impl Reporter {
    pub fn new(verbose: bool, format: OutputFormat) -> Self {
        Self {
            verbose,
            format,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn baseline(&self, baseline: &Baseline, candidates: usize) {
        self.emit(self.render_baseline(baseline, candidates));
    }

    pub fn finding(&self, finding: &Finding, baseline: &Baseline) {
        self.emit(self.render_finding(finding, baseline));
    }

    pub fn summary(&self, summary: &RunSummary) {
        self.emit(self.render_summary(summary));
    }

    fn emit(&self, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        self.progress.suspend(|| {
            for line in &lines {
                println!("{}", line);
            }
        });
    }

    fn shows(&self, verdict: Verdict) -> bool {
        self.verbose || !verdict.is_inconclusive()
    }

    pub fn render_baseline(&self, baseline: &Baseline, candidates: usize) -> Vec<String> {
        if self.format == OutputFormat::Json {
            return Vec::new();
        }

        let mut lines = vec![format!(
            "{} Baseline established for {} ({}), checking {} candidates",
            "[i]".cyan().bold(),
            baseline.domain,
            baseline.ip,
            candidates
        )];
        if self.verbose {
            lines.push(format!(
                "    Origin: {}",
                baseline.country.as_deref().unwrap_or("unknown")
            ));
            lines.push(format!("    Fetched from: {}", baseline.page.final_url));
        }
        lines
    }

    pub fn render_finding(&self, finding: &Finding, baseline: &Baseline) -> Vec<String> {
        if !self.shows(finding.verdict) {
            return Vec::new();
        }
        match self.format {
            OutputFormat::Json => json_line(finding).into_iter().collect(),
            OutputFormat::Text => self.render_text(finding, baseline),
        }
    }

    fn render_text(&self, finding: &Finding, baseline: &Baseline) -> Vec<String> {
        let url = format!("http://{}", finding.candidate.domain);
        let original = &baseline.domain;
        let mut lines = Vec::new();

        match finding.verdict {
            Verdict::DefensiveRedirect => {
                lines.push(format!(
                    "{} Domain {} redirects to the original domain {}, likely acquired defensively.",
                    "[+]".green().bold(),
                    url,
                    original
                ));
            }
            Verdict::LikelyImpersonation => {
                let probe = &finding.probe;
                lines.push(
                    format!("{} Possible typosquatting detected for domain: {}", "[!]", url)
                        .red()
                        .bold()
                        .to_string(),
                );
                lines.push(format!("    Mutation: {}", finding.candidate.family));
                lines.push(format!("    IP Address: {}", display_or_unknown(probe.ip)).green().to_string());
                lines.push(format!("    Origin: {}", probe.country.as_deref().unwrap_or("unknown")).cyan().to_string());
                if let Some(target) = &finding.redirect_target {
                    lines.push(format!("    Redirected to: {}", target).yellow().to_string());
                }
                lines.push(format!("    Content Similarity Score: {}", format_score(finding.score)));

                if self.verbose {
                    if let (Some(original_whois), Some(typo_whois)) = (&baseline.whois, &probe.whois) {
                        lines.push(
                            format!("    WHOIS Info - Original: {}, Typo: {}", original_whois, typo_whois)
                                .magenta()
                                .to_string(),
                        );
                    }
                    if let (Some(original_tls), Some(typo_tls)) = (&baseline.tls, &probe.tls) {
                        let shared = if original_tls.same_as(typo_tls) { " (same certificate)" } else { "" };
                        lines.push(
                            format!("    TLS Info - Original: {}, Typo: {}{}", original_tls, typo_tls, shared)
                                .blue()
                                .to_string(),
                        );
                    }
                    if !baseline.mx.is_empty() && !probe.mx.is_empty() {
                        lines.push(
                            format!(
                                "    MX Records - Original: [{}], Typo: [{}]",
                                baseline.mx.join(", "),
                                probe.mx.join(", ")
                            )
                            .yellow()
                            .to_string(),
                        );
                    }
                }
            }
            Verdict::NotSimilar => {
                lines.push(format!("{} Checking domain: {}", "[i]".white(), url));
                lines.push(format!(
                    "{} Content similarity score with {}: {}",
                    "[i]".white(),
                    original,
                    format_score(finding.score)
                ));
            }
            Verdict::ProbeFailed => {
                lines.push(format!(
                    "{} Failed to fetch content from {} (no similarity score)",
                    "[*]".yellow().bold(),
                    url
                ));
            }
        }

        lines
    }

    pub fn render_summary(&self, summary: &RunSummary) -> Vec<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string(&SummaryRecord { summary })
                .map_err(|err| warn!(error = %err, "failed to serialize summary"))
                .into_iter()
                .collect();
        }

        let mut lines = Vec::new();
        if summary.interrupted {
            lines.push(format!(
                "{} Run stopped early, {} candidates were not checked",
                "[*]".yellow().bold(),
                summary.unchecked()
            ));
        }

        let tag = if summary.likely_impersonations > 0 {
            "[!]".red().bold()
        } else {
            "[+]".green().bold()
        };
        lines.push(format!(
            "{} Checked {} of {} candidates: {} possible typosquatting, {} defensive redirects",
            tag, summary.checked, summary.generated, summary.likely_impersonations, summary.defensive_redirects
        ));
        if self.verbose {
            lines.push(format!(
                "    Not similar: {}, unreachable: {}",
                summary.not_similar, summary.probe_failures
            ));
        }
        lines
    }
}

fn json_line(finding: &Finding) -> Option<String> {
    serde_json::to_string(finding)
        .map_err(|err| warn!(domain = %finding.candidate.domain, error = %err, "failed to serialize finding"))
        .ok()
}

fn display_or_unknown<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "unknown".to_string())
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.2}%", score),
        None => "no score".to_string(),
    }
}

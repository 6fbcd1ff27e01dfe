use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::classifier::{ClassifierConfig, DEFAULT_CONCURRENCY, DEFAULT_THRESHOLD};
use crate::report::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "typoguard")]
#[command(version)]
#[command(about = "Detects typosquatting domains that imitate a legitimate site's content")]
pub struct Cli {
    /// Domain to protect, without scheme (e.g. example.com)
    pub domain: String,

    /// Similarity percentage a candidate must exceed to be reported
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: f64,

    /// Print every candidate checked, failed fetches and WHOIS/TLS/MX comparisons
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of candidates probed at the same time
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Seconds each network probe may take
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub probe_timeout: u64,

    /// Stop the whole run after this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// JSON file mapping brand names to known misspellings
    #[arg(long)]
    pub brands: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Only print the generated candidates, without any network access
    #[arg(long)]
    pub list: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable debug logging on stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            threshold: self.threshold,
            concurrency: self.concurrency,
            run_timeout: self.run_timeout(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value.parse().map_err(|_| format!("`{value}` is not a number"))?;
    if threshold.is_finite() {
        Ok(threshold)
    } else {
        Err("threshold must be a finite number".to_string())
    }
}

fn parse_concurrency(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("concurrency must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("`{value}` is not a positive integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["typoguard", "example.com"]).unwrap();

        assert_eq!(cli.domain, "example.com");
        assert!(!cli.verbose && !cli.list && !cli.no_progress && !cli.debug);
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.brands, None);
        assert_eq!(cli.classifier_config(), ClassifierConfig::default());
        assert_eq!(cli.probe_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn flags_flow_into_the_classifier_config() {
        let cli = Cli::try_parse_from([
            "typoguard",
            "example.com",
            "-t",
            "85.5",
            "-v",
            "-c",
            "4",
            "--timeout",
            "120",
            "--format",
            "json",
            "--brands",
            "brands.json",
        ])
        .unwrap();

        let config = cli.classifier_config();
        assert_eq!(config.threshold, 85.5);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.run_timeout, Some(Duration::from_secs(120)));
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.brands, Some(PathBuf::from("brands.json")));
    }

    #[test]
    fn rejects_invalid_values() {
        for args in [
            &["typoguard", "example.com", "-c", "0"][..],
            &["typoguard", "example.com", "-t", "NaN"],
            &["typoguard", "example.com", "-t", "high"],
            &["typoguard", "example.com", "--probe-timeout", "0"],
            &["typoguard", "example.com", "--format", "xml"],
            &["typoguard"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "accepted {args:?}");
        }
    }
}

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, warn};

use typoguard::brands::BrandDictionary;
use typoguard::classifier::Classifier;
use typoguard::config::Cli;
use typoguard::domain::Domain;
use typoguard::generator::Generator;
use typoguard::logging;
use typoguard::probe::NetworkProbe;
use typoguard::report::{OutputFormat, Reporter};
use typoguard::similarity::TfIdfScorer;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "[-]".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let progress = ProgressBar::hidden();
    logging::init(cli.debug, progress.clone())?;

    let domain = Domain::parse(&cli.domain)?;
    let brands = match &cli.brands {
        Some(path) => BrandDictionary::from_path(path)?,
        None => BrandDictionary::default(),
    };
    debug!(brands = brands.len(), "brand dictionary loaded");

    let candidates = Generator::new(brands).generate(&domain);

    if cli.list {
        for candidate in &candidates {
            println!("{}, {}", candidate.domain, candidate.family);
        }
        eprintln!("Generated {} variations", candidates.len());
        return Ok(());
    }

    let probe = NetworkProbe::new(cli.probe_timeout())?;
    let classifier = Classifier::new(cli.classifier_config(), Arc::new(probe), Arc::new(TfIdfScorer));

    let baseline = classifier.baseline(&domain).await?;

    if !cli.no_progress && cli.format == OutputFormat::Text {
        progress.set_length(candidates.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        progress.set_draw_target(ProgressDrawTarget::stderr());
    }

    let reporter = Reporter::new(cli.verbose, cli.format).with_progress(progress.clone());
    reporter.baseline(&baseline, candidates.len());

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let summary = classifier
        .run(&baseline, candidates, shutdown, |finding| {
            progress.set_message(finding.candidate.domain.clone());
            reporter.finding(&finding, &baseline);
            progress.inc(1);
        })
        .await;

    progress.finish_and_clear();
    reporter.summary(&summary);

    Ok(())
}

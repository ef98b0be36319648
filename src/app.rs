// src/app.rs

use color_eyre::eyre::{eyre, Result, WrapErr};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::commands::{Commands, OutputArgs, RequestArgs};
use crate::core::config::{BulkOptions, PacingPolicy, ScanTarget};
use crate::core::error::ValidationError;
use crate::core::knowledge_base::PolicyRegistry;
use crate::core::models::ScanResult;
use crate::core::scanner::bulk::{BulkEntry, BulkJob, BulkScanner, CancelHandle, JobState};
use crate::core::scanner::fetcher::HttpFetcher;
use crate::core::scanner::scan_target;
use crate::core::summary::BulkSummary;
use crate::report::console::Console;
use crate::report::{write_export, ExportFormat};

/// Drives one command from parsed arguments to printed (and exported) results.
pub struct App {
    console: Console,
    registry: Arc<PolicyRegistry>,
}

impl App {
    pub fn new(color: bool) -> Self {
        Self { console: Console::new(color), registry: Arc::new(PolicyRegistry::builtin().clone()) }
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Scan { url, request, output } => self.scan(&url, &request, &output).await,
            Commands::Bulk { file, urls, concurrency, delay, pacing, request, output } => {
                let mut targets = match file {
                    Some(path) => load_targets(&path)?,
                    None => Vec::new(),
                };
                targets.extend(urls);
                self.bulk(targets, concurrency, delay, pacing, &request, &output).await
            }
            Commands::Reference { header, json } => self.reference(header.as_deref(), json),
        }
    }

    async fn scan(&self, url: &str, request: &RequestArgs, output: &OutputArgs) -> Result<()> {
        let target = ScanTarget::new(url, request.scan_options(output.verbose)?)?;
        let fetcher = HttpFetcher::new(&request.fetcher_config())?;

        println!("{}", self.console.section("SINGLE URL SCAN"));
        let result = scan_target(&fetcher, &self.registry, &target).await;
        println!("{}", self.console.result(&result, target.options().verbose));

        self.export(output, std::slice::from_ref(&result))
    }

    async fn bulk(
        &self,
        urls: Vec<String>,
        concurrency: usize,
        delay: f64,
        pacing: PacingPolicy,
        request: &RequestArgs,
        output: &OutputArgs,
    ) -> Result<()> {
        let options = BulkOptions::new(concurrency, delay, request.scan_options(output.verbose)?)?.with_pacing(pacing);
        let job = BulkJob::new(&urls, options)?;
        debug!(state = %job.state(), targets = job.targets().len(), "Bulk job validated.");
        let fetcher = Arc::new(HttpFetcher::new(&request.fetcher_config())?);
        let scanner = BulkScanner::new(fetcher, self.registry.clone());

        let options = *job.options();
        println!("{}", self.console.section("BULK SCAN"));
        println!(
            "[*] Targets: {}  Concurrency: {}  Delay: {:.1}s ({})",
            job.targets().len(),
            options.concurrency,
            options.delay.as_secs_f64(),
            options.pacing
        );

        let cancel = CancelHandle::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling bulk job.");
                    cancel.cancel();
                }
            })
        };

        let console = self.console;
        let report = scanner
            .run(job, &cancel, move |progress| {
                print!("{}", console.progress(progress));
                let _ = std::io::stdout().flush();
            })
            .await;
        interrupt.abort();
        println!();

        for result in report.results() {
            println!("{}", self.console.result(result, options.scan.verbose));
        }
        if report.state() == JobState::Cancelled {
            let skipped: Vec<&BulkEntry> = report.skipped().collect();
            println!("\n{}", self.console.skipped(&skipped));
        }

        let results = report.into_results();
        println!("{}", self.console.summary(&BulkSummary::from_results(&results)));
        self.export(output, &results)
    }

    fn reference(&self, header: Option<&str>, json: bool) -> Result<()> {
        let Some(name) = header else {
            if json {
                let reference = serde_json::to_string_pretty(&self.registry.reference())
                    .wrap_err("failed to serialize the header reference")?;
                println!("{reference}");
            } else {
                println!("{}", self.console.reference(&self.registry));
            }
            return Ok(());
        };

        let policy = self.registry.lookup(name).ok_or_else(|| eyre!("{name} is not a tracked security header"))?;
        if json {
            println!("{}", serde_json::to_string_pretty(policy).wrap_err("failed to serialize the header policy")?);
        } else {
            println!("{}", self.console.policy(policy));
        }
        Ok(())
    }

    fn export(&self, output: &OutputArgs, results: &[ScanResult]) -> Result<()> {
        let Some(path) = &output.output else { return Ok(()) };
        let format = ExportFormat::resolve(output.format, path);
        write_export(path, format, results)?;
        println!("\n{}", self.console.notice(format!("Results saved to: {} ({format})", path.display())));
        Ok(())
    }
}

/// Reads target URLs from a file, one per line. Blank lines and lines
/// starting with `#` are skipped.
pub fn load_targets(path: &Path) -> Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read targets from {}", path.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(ValidationError::NoTargets).wrap_err_with(|| format!("no URLs found in {}", path.display()));
    }
    info!(path = %path.display(), count = urls.len(), "Loaded targets.");
    Ok(urls)
}

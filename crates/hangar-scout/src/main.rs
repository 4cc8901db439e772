use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use shared::catalog;
use shared::{
    ArticleFetcher, Config, ContentFilter, MailjetNotifier, NoopNotifier, Notifier,
    RegionId, RegionRunSummary, ReportStore, RunMode, RunOrchestrator, ScoutError, SearchEngine,
    SearchProvider, SerpApiClient,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "hangar-scout")]
#[command(about = "Collect hangar construction and MRO news into weekly regional reports")]
struct Cli {
    /// Directory holding the per-region report files (overrides REPORTS_DIR)
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Collect the last BACKFILL_MONTHS months for every region
    Backfill,
    /// Collect everything since the last run for every region (default)
    Weekly,
    /// Run a single region
    Region {
        /// uk_na or emea
        region: RegionId,
        /// Backfill instead of a weekly run
        #[arg(long)]
        backfill: bool,
    },
    /// Check configuration and connectivity without collecting anything
    Test,
    /// Stay in the foreground and run weekly on SCHEDULE_DAY at SCHEDULE_TIME
    Schedule,
    /// Email a region's current report as a test message
    Email {
        /// uk_na or emea
        region: RegionId,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

fn build_notifier(config: &Config) -> Result<Box<dyn Notifier>> {
    match &config.mail {
        Some(mail) => Ok(Box::new(MailjetNotifier::new(mail.clone())?)),
        None => Ok(Box::new(NoopNotifier)),
    }
}

fn build_orchestrator(config: &Config) -> Result<RunOrchestrator> {
    let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();
    for engine in &config.engines {
        providers.push(Box::new(SerpApiClient::new(
            config.serpapi_key.clone(),
            *engine,
            config.max_results_per_query,
        )?));
    }

    Ok(RunOrchestrator::new(
        ArticleFetcher::new(providers),
        ContentFilter::new(&config.exclusions),
        build_notifier(config)?,
        catalog::all_regions(&config.reports_dir),
    )
    .with_backfill_months(config.backfill_months)
    .with_notify_on_empty(config.notify_on_empty))
}

fn print_summary(summary: &RegionRunSummary) {
    println!(
        "\n✓ {} ({} run since {})",
        summary.region.display_name(),
        summary.mode,
        summary.window_start
    );
    println!("  Fetched:    {}", summary.fetched);
    println!("  Excluded:   {}", summary.excluded);
    println!("  Duplicates: {}", summary.duplicates);
    println!("  New:        {}", summary.new_articles);
    println!("  Total rows: {}", summary.total_rows);
    if summary.failed_calls > 0 {
        println!("  ⚠ {} search calls failed", summary.failed_calls);
    }
    if let Some(path) = &summary.report_path {
        println!("  📄 {}", path.display());
    }
    if summary.notified {
        println!("  📧 Summary sent");
    }
}

/// Print every region's outcome and return how many failed
fn report_results(results: &[(RegionId, shared::Result<RegionRunSummary>)]) -> usize {
    let mut failed = 0;
    for (region, result) in results {
        match result {
            Ok(summary) => print_summary(summary),
            Err(e) => {
                failed += 1;
                println!("\n✗ {}: {}", region.display_name(), e);
                if matches!(e, ScoutError::Notification(_)) {
                    println!("  (report was saved; only the email failed)");
                }
            }
        }
    }
    failed
}

async fn run_mode(orchestrator: &RunOrchestrator, mode: RunMode) -> Result<()> {
    println!("\n🔎 Starting {} run for all regions...", mode);
    let results = orchestrator.run_all(mode).await;

    let failed = report_results(&results);
    if failed > 0 {
        anyhow::bail!("{} of {} regions failed", failed, results.len());
    }
    println!("\n✓ Done!");
    Ok(())
}

async fn run_region(orchestrator: &RunOrchestrator, region: RegionId, backfill: bool) -> Result<()> {
    let mode = if backfill { RunMode::Backfill } else { RunMode::Weekly };
    println!("\n🔎 Starting {} run for {}...", mode, region.display_name());

    let result = orchestrator.run(mode, region).await;
    if report_results(&[(region, result)]) > 0 {
        anyhow::bail!("{} run failed", region.display_name());
    }
    Ok(())
}

async fn run_checks(config: &Config, orchestrator: &RunOrchestrator) -> Result<()> {
    let mut ok = true;

    println!("\n🔧 Checking configuration...");
    println!(
        "  Search providers: {}",
        orchestrator.fetcher().provider_names().join(", ")
    );
    println!("  Reports: {}", config.reports_dir.display());
    println!("  Schedule: {}", config.schedule);

    println!("\n🌐 Checking SerpAPI account...");
    let engine = config.engines.first().copied().unwrap_or(SearchEngine::GoogleNews);
    let client = SerpApiClient::new(config.serpapi_key.clone(), engine, config.max_results_per_query)?;
    match client.check_account().await {
        Ok(account) => {
            println!(
                "  ✓ {} ({})",
                account.account_email.as_deref().unwrap_or("unknown account"),
                account.plan_name.as_deref().unwrap_or("unknown plan")
            );
            if let Some(left) = account.total_searches_left {
                println!("  Searches left: {}", left);
            }
        }
        Err(e) => {
            ok = false;
            println!("  ✗ {}", e);
        }
    }

    println!("\n📧 Checking notifier ({})...", orchestrator.notifier().name());
    if config.mail.is_none() {
        println!("  ⚠ Mailjet settings incomplete; emails are disabled");
    }
    match orchestrator.notifier().check().await {
        Ok(()) => println!("  ✓ OK"),
        Err(e) => {
            ok = false;
            println!("  ✗ {}", e);
        }
    }

    println!("\n📁 Checking reports directory...");
    match std::fs::create_dir_all(&config.reports_dir)
        .and_then(|_| tempfile::NamedTempFile::new_in(&config.reports_dir))
    {
        Ok(_) => println!("  ✓ {} is writable", config.reports_dir.display()),
        Err(e) => {
            ok = false;
            println!("  ✗ {}: {}", config.reports_dir.display(), e);
        }
    }

    for region in orchestrator.regions() {
        match ReportStore::file_info(region) {
            Ok(info) if info.exists => {
                let modified = info
                    .last_modified
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "  {}: {} rows, {} bytes, modified {}",
                    region.region_id.display_name(),
                    info.row_count,
                    info.size,
                    modified
                );
            }
            Ok(info) => println!(
                "  {}: no report yet ({})",
                region.region_id.display_name(),
                info.path.display()
            ),
            Err(e) => {
                ok = false;
                println!("  ✗ {}: {}", region.region_id.display_name(), e);
            }
        }
    }

    if !ok {
        anyhow::bail!("One or more checks failed");
    }
    println!("\n✓ All checks passed");
    Ok(())
}

async fn run_schedule(config: &Config, orchestrator: &RunOrchestrator) -> Result<()> {
    println!("\n⏰ Running {} (Ctrl-C to stop)", config.schedule);

    loop {
        let now = Local::now().naive_local();
        let next = config.schedule.next_run_after(now);
        info!(next_run = %next, "Waiting for next scheduled run");

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down scheduler");
                return Ok(());
            }
        }

        let results = orchestrator.run_all(RunMode::Weekly).await;
        let failed = report_results(&results);
        if failed > 0 {
            warn!(failed, "Scheduled run finished with failures");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.reports_dir {
        config.reports_dir = dir;
    }
    config.log_redacted();

    let orchestrator = build_orchestrator(&config)?;

    match cli.command.unwrap_or(Command::Weekly) {
        Command::Backfill => run_mode(&orchestrator, RunMode::Backfill).await,
        Command::Weekly => run_mode(&orchestrator, RunMode::Weekly).await,
        Command::Region { region, backfill } => run_region(&orchestrator, region, backfill).await,
        Command::Test => run_checks(&config, &orchestrator).await,
        Command::Schedule => run_schedule(&config, &orchestrator).await,
        Command::Email { region } => {
            if config.mail.is_none() {
                warn!("Mailjet settings incomplete; nothing will be sent");
            }
            let path = orchestrator
                .send_test_report(region, Local::now().date_naive())
                .await
                .map_err(|e| {
                    error!(region = %region, error = %e, "Test email failed");
                    e
                })
                .context("Failed to send test email")?;
            println!("\n📧 Sent {} to {}", path.display(), orchestrator.notifier().name());
            Ok(())
        }
    }
}

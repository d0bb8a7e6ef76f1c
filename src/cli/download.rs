use crate::cli::DownloadArgs;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tcia_fetch::config::Config;
use tcia_fetch::fetch::HttpFetcher;
use tcia_fetch::output::{exit_code, BarProgress, RETRY_MANIFEST};
use tcia_fetch::runner::{NoProgress, ProgressSink};
use tcia_fetch::{BatchSummary, DownloadPlan, DownloadRequest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn execute(args: DownloadArgs) -> anyhow::Result<ExitCode> {
    let mut config = Config::load_or_default(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(njobs) = args.njobs {
        config.njobs = njobs;
    }
    if let Some(max_retries) = args.max_retries {
        config.retry.max_retries = max_retries;
        config.honor_manifest_retries = false;
    }
    if let Some(delay_ms) = args.retry_delay_ms {
        config.retry.delay_ms = delay_ms;
    }
    if let Some(backoff) = args.backoff {
        config.retry.backoff = backoff;
    }
    if args.stop_on_permanent {
        config.retry.stop_on_permanent = true;
    }
    if let Some(server_url) = args.server_url {
        config.server_url = server_url;
    }
    if args.no_verify_zip {
        config.verify_zip_metadata = false;
    }
    if args.overwrite {
        config.skip_existing = false;
    }
    if args.no_progress {
        config.progress = false;
    }

    info!("Parsing manifest file {:?}", args.manifest);
    let request = DownloadRequest {
        manifest_path: args.manifest,
        output_base: args.output,
        config,
    };
    let plan = DownloadPlan::build(&request)?;

    if args.dry_run {
        info!("DRY RUN - nothing will be downloaded");
        print_execution_plan(&plan);
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; abandoning remaining series");
            on_interrupt.cancel();
        }
    });

    let progress: Box<dyn ProgressSink> =
        if request.config.progress && std::io::stderr().is_terminal() {
            Box::new(BarProgress::new())
        } else {
            Box::new(NoProgress)
        };

    let fetcher = Arc::new(HttpFetcher::from_config(&request.config)?);
    let summary = plan.execute(fetcher, progress.as_ref(), &cancel).await?;

    print_summary(&plan, &summary);

    Ok(ExitCode::from(exit_code(&summary) as u8))
}

fn print_execution_plan(plan: &DownloadPlan) {
    println!("\n=== Download Plan ===\n");
    println!("Manifest: {:?}", plan.manifest_path);
    println!("Destination: {:?}", plan.destination);
    println!("Jobs: {}", plan.njobs);
    println!(
        "Retries: {} ({} backoff, {}ms base delay)",
        plan.policy.max_retries, plan.policy.backoff, plan.policy.delay_ms
    );

    println!("\nSeries to download ({}):", plan.items.len());
    for item in &plan.items {
        let status = if item.destination.exists() {
            " [exists]"
        } else {
            ""
        };
        println!("  - {} -> {:?}{}", item.series_id, item.destination, status);
    }
    println!();
}

fn print_summary(plan: &DownloadPlan, summary: &BatchSummary) {
    println!(
        "Downloaded {}/{} series to {:?} in {:.1}s",
        summary.succeeded,
        summary.total,
        plan.destination,
        summary.duration.as_secs_f64()
    );

    if summary.cancelled {
        println!("Run was cancelled before all series finished.");
    }

    if !summary.failed_items.is_empty() {
        println!("\nFailed series ({}):", summary.failed);
        for failed in &summary.failed_items {
            println!(
                "  - {} ({} attempts): {}",
                failed.series_id, failed.attempts, failed.error
            );
        }
        println!(
            "\nRe-run the same command to fetch only the missing series \
             (also listed in {:?})",
            plan.destination.join(RETRY_MANIFEST)
        );
    }
}

mod cli;
mod config;
mod logging;
mod progress;

use std::sync::Arc;

use clap::Parser;
use docharvest_engine::{CancellationToken, HarvestReport, Harvester, HttpRenderer, Renderer};
use engine_logging::{engine_info, engine_warn};

use crate::cli::{Args, RendererKind};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::initialize(args.log_level.into(), args.log_destination());

    let settings = config::load(&args)?;
    let renderer = build_renderer(settings.renderer);
    let harvest = settings.into_harvest_config()?;
    engine_info!(
        "Harvesting {} into {:?}",
        harvest.page_url,
        harvest.output_dir
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("Interrupted; cancelling outstanding downloads");
                on_signal.cancel();
            }
        });

        Harvester::new(harvest, renderer)
            .with_progress_sink(Arc::new(progress::LogProgressSink))
            .with_cancellation(cancel)
            .run()
            .await
    });

    print_summary(&report);
    Ok(())
}

fn build_renderer(kind: RendererKind) -> Arc<dyn Renderer> {
    match kind {
        RendererKind::Http => Arc::new(HttpRenderer::default()),
        #[cfg(feature = "chromium")]
        RendererKind::Chromium => Arc::new(docharvest_engine::ChromiumRenderer::new()),
        #[cfg(not(feature = "chromium"))]
        RendererKind::Chromium => {
            engine_warn!("Built without the `chromium` feature; using the HTTP renderer");
            Arc::new(HttpRenderer::default())
        }
    }
}

fn print_summary(report: &HarvestReport) {
    let batch = &report.batch;
    println!(
        "{}: {} link(s) found{}, {} rejected",
        report.page_url,
        report.raw_links,
        if report.from_snapshot { " (from snapshot)" } else { "" },
        report.rejected.len()
    );
    println!(
        "downloads: {} saved, {} skipped, {} failed",
        batch.saved(),
        batch.skipped(),
        batch.failed()
    );
    for (link, err) in batch.failures() {
        println!("  failed {link}: {err}");
    }
}

//! AWS Lambda entry point serving the HTTP API.

use anyhow::Context;
use clap::Parser;
use lambda_http::{run, service_fn, Error, Request};
use loss_report::cli::{init_tracing, ServiceArgs};
use loss_report::{http, AppContext};
use std::sync::Arc;

/// Loss-report HTTP API on AWS Lambda.
#[derive(Parser, Debug)]
#[command(name = "bootstrap", version)]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LOSS_REPORT_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "info" });

    // Fetch pdfium during init.
    tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
        .context("Failed to download PDFium engine")?;

    let config = cli.service.build_config().await?;
    tracing::info!("Starting with {:?}", config);
    let ctx = Arc::new(
        AppContext::from_config(config)
            .await
            .context("Failed to start service")?,
    );

    run(service_fn(move |event: Request| {
        let ctx = Arc::clone(&ctx);
        async move { http::handle(event, &ctx).await }
    }))
    .await
}

//! CLI binary for loss-report.
//!
//! A thin shim over the library crate: `ingest` runs one photo through the
//! pipeline, `report` renders a PDF, `history` lists stored results.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use loss_report::cli::{init_tracing, ServiceArgs};
use loss_report::report::report_filename;
use loss_report::{
    AppContext, HistoryStore, IngestRequest, ReportRenderer, ReportSpec, UploadedFile,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(prefix: &'static str, msg: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&TICKS),
    );
    bar.set_prefix(prefix);
    bar.set_message(msg);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Describe a photo (prints the stored record as JSON)
  loss-report ingest kitchen.jpg --damage-type "Water Damage"

  # Describe a photo and write its PDF report
  loss-report ingest hood.png --custom-damage "Hail Damage" --report hood.pdf

  # Re-render the most recent result
  loss-report report

  # Render an edited report
  loss-report report --spec edited.json -o claim-1042.pdf

  # List stored results
  loss-report history

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  LOSS_REPORT_HISTORY     History log path
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
"#;

/// Describe damage photos with a vision LLM and render loss reports.
#[derive(Parser, Debug)]
#[command(
    name = "loss-report",
    version,
    about = "Describe damage photos with a vision LLM and render PDF loss reports",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LOSS_REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LOSS_REPORT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Caption and describe one photo, then append the result to history.
    Ingest {
        /// Photo to analyse (png, jpg, jpeg, gif).
        image: PathBuf,

        /// Damage category, e.g. "Water Damage".
        #[arg(long)]
        damage_type: Option<String>,

        /// Free-text category; overrides --damage-type.
        #[arg(long)]
        custom_damage: Option<String>,

        /// Also render the result to this PDF.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Render a PDF from a stored result or a ReportSpec JSON file.
    Report {
        /// 0-based history index. Defaults to the most recent result.
        #[arg(long, conflicts_with = "spec")]
        record_index: Option<usize>,

        /// JSON file with `damage_type`, `description` and optional `image_data`.
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Output PDF. Defaults to loss_description_<label>.pdf.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored results.
    History {
        /// Print the full records as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Spinners replace INFO logs unless the user asked for detail.
    let show_progress = !cli.quiet && !cli.verbose;
    let level = if cli.verbose {
        "debug"
    } else if show_progress || cli.quiet {
        "error"
    } else {
        "info"
    };
    init_tracing(level);

    let config = cli.service.build_config().await?;

    match cli.command {
        Command::Ingest {
            image,
            damage_type,
            custom_damage,
            report,
        } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read {:?}", image))?;
            let filename = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let ctx = AppContext::from_config(config)
                .await
                .context("Failed to start service")?;
            let request = IngestRequest {
                file: Some(UploadedFile::new(filename, bytes)),
                damage_type,
                custom_damage,
            };

            let bar = show_progress.then(|| spinner("Analysing", "captioning photo…"));
            let result = ctx.orchestrator.ingest(request).await;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
            let record = result.context("Ingestion failed")?;

            println!(
                "{}",
                serde_json::to_string_pretty(&record).context("Failed to serialise record")?
            );

            if let Some(path) = report {
                ensure_pdf_engine(show_progress)?;
                write_report(&ctx.renderer, &record.to_report_spec(), &path, cli.quiet).await?;
            }
        }

        Command::Report {
            record_index,
            spec,
            output,
        } => {
            let spec = match spec {
                Some(path) => {
                    let raw = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {:?}", path))?;
                    serde_json::from_slice::<ReportSpec>(&raw)
                        .with_context(|| format!("Invalid report spec in {:?}", path))?
                }
                None => {
                    let history = HistoryStore::open(&config.history_path)
                        .await
                        .context("Failed to open history")?;
                    let records = history.read_all().await;
                    let index = match record_index {
                        Some(i) => i,
                        None if records.is_empty() => bail!("History is empty"),
                        None => records.len() - 1,
                    };
                    match records.get(index) {
                        Some(r) => r.to_report_spec(),
                        None => bail!(
                            "No record at index {} (history has {})",
                            index,
                            records.len()
                        ),
                    }
                }
            };

            let path = output.unwrap_or_else(|| PathBuf::from(report_filename(&spec.damage_type)));
            ensure_pdf_engine(show_progress)?;
            write_report(&ReportRenderer::new(), &spec, &path, cli.quiet).await?;
        }

        Command::History { json } => {
            let history = HistoryStore::open(&config.history_path)
                .await
                .context("Failed to open history")?;
            let records = history.read_all().await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&records).context("Failed to serialise history")?
                );
            } else if records.is_empty() {
                eprintln!("{}", dim("No results yet."));
            } else {
                for (i, r) in records.iter().enumerate() {
                    println!(
                        "{:>4}  {}  {:<24}  {}",
                        i,
                        dim(&r.timestamp),
                        r.damage_type,
                        r.filename
                    );
                }
            }
        }
    }

    Ok(())
}

async fn write_report(
    renderer: &ReportRenderer,
    spec: &ReportSpec,
    path: &Path,
    quiet: bool,
) -> Result<()> {
    let pdf = renderer
        .render(spec)
        .await
        .context("PDF generation failed")?;
    tokio::fs::write(path, &pdf)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    if !quiet {
        eprintln!(
            "{}  {}  {}",
            green("✔"),
            bold(&path.display().to_string()),
            dim(&format!("{} bytes", pdf.len()))
        );
    }
    Ok(())
}

/// Download pdfium on first use, with a progress bar when interactive.
fn ensure_pdf_engine(show_progress: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }

    if !show_progress {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS),
    );
    bar.set_prefix("PDF engine");
    bar.enable_steady_tick(Duration::from_millis(80));

    let progress = bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if progress.length().unwrap_or(0) != t {
                    progress.set_length(t);
                }
            }
            progress.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    bar.finish_with_message("ready ✓");
    Ok(())
}

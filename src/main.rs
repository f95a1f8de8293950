mod bot;
mod config;
mod error;
mod fetch;
mod images;
mod listing_url;
mod notify;
mod parser;
mod pdf;
mod pipeline;
mod record;
mod report;
mod snapshot;
mod text;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::notify::{ConsoleNotifier, Notifier, TelegramApi, TelegramNotifier};
use crate::pdf::WkHtmlToPdf;
use crate::pipeline::{Pipeline, RunReport, State};

#[derive(Parser)]
#[command(name = "listing_report", about = "cian.ru listing scraper and PDF report builder")]
struct Cli {
    /// Settings file (default: listing_report.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch listings, build their reports and deliver them
    Run {
        /// Listing URLs
        #[arg(required = true)]
        urls: Vec<String>,
        /// Skip PDF conversion and deliver the text report
        #[arg(long)]
        no_pdf: bool,
        /// Deliver to the admin chat instead of stdout
        #[arg(long)]
        telegram: bool,
    },
    /// Print the extracted fields of one listing as JSON
    Extract {
        /// Listing URL to fetch
        #[arg(required_unless_present = "html", conflicts_with = "html")]
        url: Option<String>,
        /// Saved listing page to read instead of fetching
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Serve listing requests over Telegram long polling
    Bot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run { urls, no_pdf, telegram } => {
            let client = fetch::build_client(&settings.http)?;
            let mut pipeline = Pipeline::new(&settings, client.clone(), WkHtmlToPdf::new(settings.pdf.clone()))?;
            if no_pdf {
                pipeline = pipeline.without_pdf();
            }
            let reports = if telegram {
                let Some(chat_id) = settings.telegram.admin_chat_id else {
                    bail!("--telegram needs telegram.admin_chat_id");
                };
                let api = TelegramApi::new(client, &settings.telegram)?;
                run_all(&pipeline, &urls, &TelegramNotifier::new(api, chat_id)).await
            } else {
                run_all(&pipeline, &urls, &ConsoleNotifier).await
            };
            print_summary(&reports);
            Ok(())
        }
        Commands::Extract { url, html } => {
            let (id, url, body) = match (url, html) {
                (_, Some(path)) => read_saved_page(&path)?,
                (Some(url), None) => {
                    let client = fetch::build_client(&settings.http)?;
                    let body = fetch::fetch_page(&client, &url).await?;
                    let id = listing_url::listing_id(&url).unwrap_or_else(|| "unknown".to_string());
                    (id, url, body)
                }
                (None, None) => bail!("either a URL or --html is required"),
            };
            let now = Local::now().naive_local();
            let page = parser::Page::parse(&body);
            if page.is_empty() {
                bail!("{} has no content", url);
            }
            let record = parser::extract::extract_all(&id, &url, &page, now);
            println!("{}", snapshot::to_json(&record, now)?);
            Ok(())
        }
        Commands::Bot => {
            let client = fetch::build_client(&settings.http)?;
            let api = TelegramApi::new(client.clone(), &settings.telegram)?;
            let pipeline = Pipeline::new(&settings, client, WkHtmlToPdf::new(settings.pdf.clone()))?;
            bot::Bot::new(api, pipeline, &settings).run().await
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_all<N: Notifier + Sync>(pipeline: &Pipeline<WkHtmlToPdf>, urls: &[String], notifier: &N) -> Vec<RunReport> {
    let pb = if urls.len() > 1 {
        ProgressBar::new(urls.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})") {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut reports = Vec::with_capacity(urls.len());
    for url in urls {
        if !listing_url::is_listing_url(url) {
            tracing::warn!(url = %url, "not a flat-sale listing url, trying anyway");
        }
        reports.push(pipeline.run(url, notifier).await);
        pb.inc(1);
    }
    pb.finish_and_clear();
    reports
}

fn read_saved_page(path: &Path) -> anyhow::Result<(String, String, String)> {
    let body = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "local".to_string());
    Ok((id, format!("file://{}", path.display()), body))
}

fn print_summary(reports: &[RunReport]) {
    let ok = reports.iter().filter(|r| r.is_done()).count();
    for report in reports {
        match &report.state {
            State::Done => match (&report.pdf, &report.conversion_error) {
                (Some(pdf), _) => println!("  ok      {} -> {}", report.url, pdf.display()),
                (None, Some(e)) => println!("  ok      {} (text only: {})", report.url, e),
                (None, None) => println!("  ok      {} (text only)", report.url),
            },
            State::Failed { stage, reason } => println!("  failed  {} at {}: {}", report.url, stage, reason),
            State::Running(stage) => println!("  stopped {} at {}", report.url, stage),
        }
    }
    println!("Done: {} listings ({} ok, {} failed).", reports.len(), ok, reports.len() - ok);
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

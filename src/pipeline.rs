use std::fmt;
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::RenderError;
use crate::fetch::fetch_page;
use crate::images::ImageFetcher;
use crate::listing_url::listing_id;
use crate::notify::Notifier;
use crate::parser::extract::extract_all;
use crate::parser::Page;
use crate::pdf::{output_path, PdfConverter};
use crate::record::ListingRecord;
use crate::report::caption::{full_text, short_caption, Attribution};
use crate::report::{render_report, ReportContext, ReportFiles, Templates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Parsing,
    Extracting,
    Rendering,
    ConvertingToPdf,
    Notifying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Parsing => "parsing",
            Stage::Extracting => "extracting",
            Stage::Rendering => "rendering",
            Stage::ConvertingToPdf => "converting to pdf",
            Stage::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Running(Stage),
    Done,
    Failed { stage: Stage, reason: String },
}

/// Everything one run produced, whether or not it finished.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub url: String,
    pub listing_id: Option<String>,
    pub record: Option<ListingRecord>,
    pub files: Option<ReportFiles>,
    pub pdf: Option<PathBuf>,
    /// Set when conversion failed and the full text went out instead.
    pub conversion_error: Option<String>,
    /// Stages entered, in order.
    pub stages: Vec<Stage>,
    pub state: State,
}

impl RunReport {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            listing_id: None,
            record: None,
            files: None,
            pdf: None,
            conversion_error: None,
            stages: Vec::new(),
            state: State::Running(Stage::Fetching),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    fn enter(&mut self, stage: Stage) {
        info!(listing_id = self.listing_id.as_deref().unwrap_or("-"), %stage, "stage");
        self.stages.push(stage);
        self.state = State::Running(stage);
    }
}

struct StageFailure {
    stage: Stage,
    reason: String,
}

impl StageFailure {
    fn new(stage: Stage, reason: impl ToString) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Fetch, extract, render, convert and deliver one listing.
pub struct Pipeline<C> {
    client: Client,
    images: ImageFetcher,
    templates: Templates,
    context: ReportContext,
    attribution: Attribution,
    downloads_dir: PathBuf,
    converter: C,
    skip_pdf: bool,
}

impl<C: PdfConverter + Sync> Pipeline<C> {
    pub fn new(settings: &Settings, client: Client, converter: C) -> Result<Self, RenderError> {
        Ok(Self {
            images: ImageFetcher::new(client.clone(), settings.images.clone()),
            client,
            templates: Templates::load(settings.templates_dir.as_deref())?,
            context: ReportContext {
                realtor: settings.realtor.clone(),
                embed_limit: settings.images.embed_limit,
            },
            attribution: Attribution {
                username: settings.telegram.bot_username.clone(),
                link: settings.telegram.bot_link.clone(),
            },
            downloads_dir: settings.downloads_dir.clone(),
            converter,
            skip_pdf: false,
        })
    }

    /// Deliver the full text instead of converting to PDF.
    pub fn without_pdf(mut self) -> Self {
        self.skip_pdf = true;
        self
    }

    pub fn attribution(&self) -> &Attribution {
        &self.attribution
    }

    pub async fn run<N: Notifier + Sync>(&self, url: &str, notifier: &N) -> RunReport {
        self.run_at(url, notifier, Local::now().naive_local()).await
    }

    /// [`Pipeline::run`] with a fixed clock. Stage errors end up in [`RunReport::state`].
    pub async fn run_at<N: Notifier + Sync>(&self, url: &str, notifier: &N, now: NaiveDateTime) -> RunReport {
        let mut run = RunReport::new(url);
        match self.drive(&mut run, notifier, now).await {
            Ok(()) => {
                info!(listing_id = run.listing_id.as_deref().unwrap_or("-"), pdf = run.pdf.is_some(), "done");
                run.state = State::Done;
            }
            Err(StageFailure { stage, reason }) => {
                error!(
                    listing_id = run.listing_id.as_deref().unwrap_or("-"),
                    %stage,
                    %reason,
                    "run failed"
                );
                run.state = State::Failed { stage, reason };
            }
        }
        run
    }

    async fn drive<N: Notifier + Sync>(
        &self,
        run: &mut RunReport,
        notifier: &N,
        now: NaiveDateTime,
    ) -> Result<(), StageFailure> {
        run.enter(Stage::Fetching);
        let id = listing_id(&run.url).ok_or_else(|| StageFailure::new(Stage::Fetching, "no listing id in url"))?;
        run.listing_id = Some(id.clone());
        let body = fetch_page(&self.client, &run.url)
            .await
            .map_err(|e| StageFailure::new(Stage::Fetching, e))?;

        let mut record = self.extract(run, &id, &body, now)?;
        let dir = self.downloads_dir.join(&id);
        let sources: Vec<String> = record.images.iter().map(|slot| slot.source_url.clone()).collect();
        if !sources.is_empty() {
            record.images = self.images.download_all(&dir, &sources).await;
        }
        run.record = Some(record.clone());

        run.enter(Stage::Rendering);
        let rendered = render_report(&record, &self.templates, &self.context)
            .map_err(|e| StageFailure::new(Stage::Rendering, e))?;
        let files = rendered.write_to(&dir).map_err(|e| {
            StageFailure::new(Stage::Rendering, format!("cannot write report to {}: {}", dir.display(), e))
        })?;
        run.files = Some(files.clone());

        if self.skip_pdf {
            debug!(listing_id = %id, "pdf conversion skipped");
        } else {
            run.enter(Stage::ConvertingToPdf);
            match self.converter.convert(&files, &output_path(&dir, now)).await {
                Ok(pdf) => run.pdf = Some(pdf),
                Err(e) => {
                    warn!(listing_id = %id, error = %e, "pdf conversion failed, sending text instead");
                    run.conversion_error = Some(e.to_string());
                }
            }
        }

        run.enter(Stage::Notifying);
        let delivered = match &run.pdf {
            Some(pdf) => notifier.send_document(pdf, &short_caption(&record, &self.attribution)).await,
            None => notifier.send_text(&full_text(&record)).await,
        };
        delivered.map_err(|e| StageFailure::new(Stage::Notifying, e))
    }

    /// Parsing and extraction. Synchronous so the parsed document never lives across an await.
    fn extract(
        &self,
        run: &mut RunReport,
        id: &str,
        body: &str,
        now: NaiveDateTime,
    ) -> Result<ListingRecord, StageFailure> {
        run.enter(Stage::Parsing);
        let page = Page::parse(body);
        if page.is_empty() {
            return Err(StageFailure::new(Stage::Parsing, "document is empty"));
        }
        run.enter(Stage::Extracting);
        Ok(extract_all(id, &run.url, &page, now))
    }
}

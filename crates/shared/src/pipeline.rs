//! The newsletter run: fetch, summarize, render, save, open, deliver.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::digest::DigestRenderer;
use crate::guardian::{build_query, ContentSource, GuardianClient};
use crate::io::{open_in_viewer, save_digest};
use crate::mailer::{DeliveryRequest, Mailer, SmtpMailer};
use crate::models::{ArticleSummary, DigestItem};
use crate::summarizer::Summarizer;

/// Per-invocation choices, usually from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub topics: Vec<String>,
    pub max_articles: usize,
    pub recipient: Option<String>,
    pub subject: String,
    pub no_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    NoRecipient,
    MissingConfig(Vec<&'static str>),
    Sent { to: String },
    Failed { to: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Skipped,
    Opened,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub item_count: usize,
    pub opened: OpenOutcome,
    pub delivery: DeliveryOutcome,
}

/// Run once against The Guardian and a real SMTP relay. The only error this
/// returns for an otherwise healthy machine is a missing `GUARDIAN_API_KEY`.
pub async fn run(config: &Config, options: &RunOptions) -> Result<RunReport> {
    let api_key = config
        .guardian_api_key
        .as_deref()
        .context("Missing GUARDIAN_API_KEY. Set it in the environment or in a .env file.")?;

    let source = GuardianClient::new(api_key, config.guardian_base_url.clone())?;
    let summarizer = Summarizer::from_config(config)?;

    let mailer = SmtpMailer;
    let pipeline = Pipeline::new(config, &source, &summarizer, &mailer);
    pipeline.execute(options).await
}

pub struct Pipeline<'a, S: ContentSource, M: Mailer> {
    config: &'a Config,
    source: &'a S,
    summarizer: &'a Summarizer,
    mailer: &'a M,
    viewer: fn(&Path) -> Result<()>,
}

impl<'a, S: ContentSource, M: Mailer> Pipeline<'a, S, M> {
    pub fn new(config: &'a Config, source: &'a S, summarizer: &'a Summarizer, mailer: &'a M) -> Self {
        Self {
            config,
            source,
            summarizer,
            mailer,
            viewer: open_in_viewer,
        }
    }

    /// Replace the function used to show the saved file.
    pub fn with_viewer(mut self, viewer: fn(&Path) -> Result<()>) -> Self {
        self.viewer = viewer;
        self
    }

    pub async fn execute(&self, options: &RunOptions) -> Result<RunReport> {
        let articles = self.collect(options).await;

        let generated_at = Local::now();
        let items: Vec<DigestItem> = articles.iter().map(DigestItem::from).collect();
        let html = DigestRenderer::render(&items, &generated_at);
        let output_path = save_digest(&html, &self.config.output_dir, &generated_at)
            .context("Failed to save newsletter")?;
        println!("[render] wrote {}", display_path(&output_path));

        let opened = self.open(options, &output_path);

        let delivery = self.deliver(options, &html).await;

        println!("[done] Output: {}", output_path.display());

        Ok(RunReport {
            output_path,
            item_count: items.len(),
            opened,
            delivery,
        })
    }

    fn open(&self, options: &RunOptions, path: &Path) -> OpenOutcome {
        if options.no_open {
            println!("[open] Skipped opening browser (--no-open flag set)");
            return OpenOutcome::Skipped;
        }

        println!("[open] Opening {}", display_path(path));
        match (self.viewer)(path) {
            Ok(()) => OpenOutcome::Opened,
            Err(e) => {
                tracing::warn!(error = %e, "could not open newsletter in viewer");
                println!("[open] Could not open viewer: {:#}", e);
                OpenOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    /// Search, then fetch and summarize each hit in source order.
    async fn collect(&self, options: &RunOptions) -> Vec<ArticleSummary> {
        println!(
            "[fetch] Searching for \"{}\" (up to {} articles)...",
            build_query(&options.topics),
            options.max_articles
        );

        let results = match self
            .source
            .search_articles(&options.topics, options.max_articles)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "article search failed");
                println!("[fetch] Search failed: {:#}", e);
                Vec::new()
            }
        };
        println!("[fetch] Found {} articles", results.len());

        let mut articles = Vec::with_capacity(results.len());
        for meta in &results {
            let body = match self.source.article_body(&meta.id).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(id = %meta.id, error = %format!("{:#}", e), "body unavailable, using excerpt");
                    crate::guardian::excerpt_to_text(&meta.trail_text)
                }
            };
            let summary = self.summarizer.summarize(&meta.headline, &body).await;
            articles.push(ArticleSummary::new(meta, body, summary));
        }

        articles
    }

    async fn deliver(&self, options: &RunOptions, html: &str) -> DeliveryOutcome {
        let Some(to) = self.config.resolve_recipient(options.recipient.as_deref()) else {
            println!("[email] No recipient (--to or TO_EMAIL) provided; skipping send.");
            return DeliveryOutcome::NoRecipient;
        };

        let request = match DeliveryRequest::from_settings(&self.config.smtp, &to, &options.subject, html) {
            Ok(request) => request,
            Err(missing) => {
                println!(
                    "[email] Missing SMTP config: {}. Add them to your .env.",
                    missing.join(", ")
                );
                return DeliveryOutcome::MissingConfig(missing);
            }
        };

        println!(
            "[email] sending to {} via {}:{} as {}",
            request.to, request.host, request.port, request.from_email
        );
        match self.mailer.deliver(&request).await {
            Ok(()) => {
                println!("[email] sent.");
                DeliveryOutcome::Sent { to }
            }
            Err(e) => {
                tracing::warn!(error = %e, "email delivery failed");
                println!("[email] ERROR: {}", e);
                DeliveryOutcome::Failed {
                    to,
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn display_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

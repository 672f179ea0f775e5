use anyhow::Result;
use clap::Parser;
use shared::{parse_topics, run, Config, RunOptions};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ai-newsletter")]
#[command(about = "Fetch, summarize and render a news digest, then optionally email it")]
struct Args {
    /// Comma-separated topics (e.g. "ai,technology"); defaults to DEFAULT_TOPICS
    #[arg(long)]
    topics: Option<String>,

    /// Maximum number of articles to include; defaults to MAX_ARTICLES
    #[arg(long, alias = "max_articles")]
    max_articles: Option<usize>,

    /// Recipient email address; defaults to TO_EMAIL
    #[arg(long)]
    to: Option<String>,

    /// Subject line for the email
    #[arg(long, default_value = "AI Newsletter")]
    subject: String,

    /// Do not open the newsletter in a browser (useful for cron jobs)
    #[arg(long, alias = "no_open")]
    no_open: bool,

    /// Directory for the generated HTML; defaults to NEWSLETTER_OUTPUT_DIR or ./out
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    tracing::debug!(?args, "parsed arguments");

    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    // An explicit but empty --topics searches the fallback topic.
    let topics = match args.topics.as_deref() {
        Some(raw) => parse_topics(raw),
        None => config.default_topics.clone(),
    };

    let options = RunOptions {
        topics,
        max_articles: args.max_articles.unwrap_or(config.max_articles),
        recipient: args.to,
        subject: args.subject,
        no_open: args.no_open,
    };

    run(&config, &options).await?;

    Ok(())
}

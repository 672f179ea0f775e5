// Public modules
pub mod config;
pub mod digest;
pub mod guardian;
pub mod io;
pub mod mailer;
pub mod models;
pub mod pipeline;
pub mod summarizer;

// Re-export commonly used types
pub use config::{parse_topics, Config, SmtpSettings};
pub use digest::DigestRenderer;
pub use guardian::{build_query, ArticleMeta, ContentSource, GuardianClient};
pub use io::{open_in_viewer, save_digest};
pub use mailer::{DeliveryError, DeliveryRequest, Mailer, SmtpMailer};
pub use models::{ArticleSummary, DigestItem};
pub use pipeline::{run, DeliveryOutcome, OpenOutcome, Pipeline, RunOptions, RunReport};
pub use summarizer::{fallback_summary, OpenAiSummarizer, Summarizer, Summary};

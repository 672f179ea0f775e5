use std::env;
use std::path::PathBuf;

pub const DEFAULT_TOPICS: &[&str] = &["ai", "technology"];
pub const DEFAULT_MAX_ARTICLES: usize = 5;
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_FROM_NAME: &str = "AI Newsletter";
pub const DEFAULT_OUTPUT_DIR: &str = "out";
pub const DEFAULT_GUARDIAN_BASE_URL: &str = "https://content.guardianapis.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// SMTP settings as read from the environment. Fields that have no sensible
/// default stay `None` so the pipeline can report exactly what is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    pub from_email: Option<String>,
}

impl SmtpSettings {
    /// Names of the required settings that are unset, in a stable order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.user.is_none() {
            missing.push("SMTP_USER");
        }
        if self.password.is_none() {
            missing.push("SMTP_PASSWORD");
        }
        if self.from_email.is_none() {
            missing.push("FROM_EMAIL");
        }
        missing
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub guardian_api_key: Option<String>,
    pub guardian_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub default_topics: Vec<String>,
    pub max_articles: usize,
    pub smtp: SmtpSettings,
    pub default_recipient: Option<String>,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values are
    /// treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let default_topics = get("DEFAULT_TOPICS")
            .map(|raw| parse_topics(&raw))
            .filter(|topics| !topics.is_empty())
            .unwrap_or_else(|| DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect());

        let max_articles = parse_or_default(get("MAX_ARTICLES"), "MAX_ARTICLES", DEFAULT_MAX_ARTICLES);

        let smtp_user = get("SMTP_USER");
        let smtp = SmtpSettings {
            host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port: parse_or_default(get("SMTP_PORT"), "SMTP_PORT", DEFAULT_SMTP_PORT),
            from_email: get("FROM_EMAIL").or_else(|| smtp_user.clone()),
            user: smtp_user,
            password: get("SMTP_PASSWORD"),
            from_name: get("FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
        };

        Self {
            guardian_api_key: get("GUARDIAN_API_KEY"),
            guardian_base_url: get("GUARDIAN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GUARDIAN_BASE_URL.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            default_topics,
            max_articles,
            smtp,
            default_recipient: get("TO_EMAIL"),
            output_dir: get("NEWSLETTER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    /// Explicit recipient wins over `TO_EMAIL`; blank input counts as absent.
    pub fn resolve_recipient(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::trim)
            .filter(|to| !to.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_recipient.clone())
    }

    fn try_load_dotenv() {
        // Variables already present in the process environment are never
        // overridden by dotenvy.

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/ai-newsletter/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("ai-newsletter").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

/// Split a comma-separated topic list, dropping blanks.
pub fn parse_topics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or_default<T: std::str::FromStr + Copy + std::fmt::Display>(
    value: Option<String>,
    key: &str,
    default: T,
) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "invalid number in configuration, using default");
            default
        }),
        None => default,
    }
}

use crate::guardian::ArticleMeta;

/// One fetched and summarized article. Lives only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSummary {
    pub id: String,
    pub headline: String,
    pub url: String,
    pub body: String,
    pub summary: String,
}

impl ArticleSummary {
    pub fn new(meta: &ArticleMeta, body: String, summary: String) -> Self {
        Self {
            id: meta.id.clone(),
            headline: meta.headline.clone(),
            url: meta.link().to_string(),
            body,
            summary,
        }
    }
}

/// What the renderer needs for one digest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestItem {
    pub headline: String,
    pub url: String,
    pub summary: String,
}

impl From<&ArticleSummary> for DigestItem {
    fn from(article: &ArticleSummary) -> Self {
        Self {
            headline: article.headline.clone(),
            url: article.url.clone(),
            summary: article.summary.clone(),
        }
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Topic searched when the caller supplies none.
pub const FALLBACK_TOPIC: &str = "ai";

const SEARCH_FIELDS: &str = "trailText,headline,shortUrl";
const ITEM_FIELDS: &str = "headline,trailText,bodyText";

/// Article metadata as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMeta {
    pub id: String,
    pub web_url: String,
    pub headline: String,
    pub trail_text: String,
    pub short_url: String,
}

impl ArticleMeta {
    /// Canonical link for the digest: the web URL, or the short URL if the
    /// web URL is empty.
    pub fn link(&self) -> &str {
        if self.web_url.is_empty() {
            &self.short_url
        } else {
            &self.web_url
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Up to `limit` articles matching any of `topics`, newest first.
    async fn search_articles(&self, topics: &[String], limit: usize) -> Result<Vec<ArticleMeta>>;

    /// Full body text for an article, falling back to its excerpt. May be empty.
    async fn article_body(&self, id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    response: SearchResponse,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    #[serde(default)]
    id: String,
    #[serde(default)]
    web_url: Option<String>,
    #[serde(default)]
    web_title: Option<String>,
    #[serde(default)]
    fields: Option<Fields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fields {
    headline: Option<String>,
    trail_text: Option<String>,
    short_url: Option<String>,
    body_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    #[serde(default)]
    response: ItemResponse,
}

#[derive(Debug, Default, Deserialize)]
struct ItemResponse {
    #[serde(default)]
    content: Option<ItemContent>,
}

#[derive(Debug, Deserialize)]
struct ItemContent {
    #[serde(default)]
    fields: Option<Fields>,
}

/// OR-join topics into one query, substituting the fallback topic when the
/// list is empty.
pub fn build_query(topics: &[String]) -> String {
    if topics.is_empty() {
        FALLBACK_TOPIC.to_string()
    } else {
        topics.join(" OR ")
    }
}

/// Client for The Guardian Open Platform content API.
pub struct GuardianClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GuardianClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach the Guardian API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Guardian API returned error: {} - {}", status, error_text);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse Guardian API response")
    }
}

#[async_trait]
impl ContentSource for GuardianClient {
    async fn search_articles(&self, topics: &[String], limit: usize) -> Result<Vec<ArticleMeta>> {
        let query = build_query(topics);
        let url = format!(
            "{}/search?api-key={}&q={}&order-by=newest&show-fields={}&page-size={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&query),
            urlencoding::encode(SEARCH_FIELDS),
            limit
        );
        tracing::debug!(%query, limit, "searching Guardian");

        let envelope: SearchEnvelope = self.get_json(&url).await?;

        let articles = envelope
            .response
            .results
            .into_iter()
            .map(|item| {
                let fields = item.fields.unwrap_or_default();
                let web_url = item.web_url.unwrap_or_default();
                ArticleMeta {
                    id: item.id,
                    headline: fields
                        .headline
                        .filter(|h| !h.is_empty())
                        .or(item.web_title)
                        .unwrap_or_default(),
                    trail_text: fields.trail_text.unwrap_or_default(),
                    short_url: fields.short_url.unwrap_or_else(|| web_url.clone()),
                    web_url,
                }
            })
            .collect();

        Ok(articles)
    }

    async fn article_body(&self, id: &str) -> Result<String> {
        // Article ids are paths ("technology/2025/jan/01/slug"); keep the slashes.
        let path = id
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!(
            "{}/{}?api-key={}&show-fields={}",
            self.base_url,
            path,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(ITEM_FIELDS)
        );

        let envelope: ItemEnvelope = self.get_json(&url).await?;
        let fields = envelope
            .response
            .content
            .and_then(|c| c.fields)
            .unwrap_or_default();

        let body = match fields.body_text.filter(|b| !b.trim().is_empty()) {
            Some(body) => body,
            None => fields
                .trail_text
                .map(|excerpt| excerpt_to_text(&excerpt))
                .unwrap_or_default(),
        };

        Ok(body.trim().to_string())
    }
}

/// Trail text may carry inline markup; reduce it to plain text on one line.
pub fn excerpt_to_text(excerpt: &str) -> String {
    if !excerpt.contains('<') && !excerpt.contains('&') {
        return excerpt.trim().to_string();
    }
    let text = html2text::from_read(excerpt.as_bytes(), 10_000);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_build_query_or_joins_topics() {
        let topics = vec!["ai".to_string(), "technology".to_string()];
        assert_eq!(build_query(&topics), "ai OR technology");
    }

    #[test]
    fn test_build_query_single_topic() {
        assert_eq!(build_query(&["climate change".to_string()]), "climate change");
    }

    #[test]
    fn test_build_query_empty_uses_fallback() {
        assert_eq!(build_query(&[]), "ai");
    }

    #[test]
    fn test_link_prefers_web_url() {
        let mut article = ArticleMeta {
            id: "a".to_string(),
            web_url: "https://www.theguardian.com/a".to_string(),
            headline: "A".to_string(),
            trail_text: String::new(),
            short_url: "https://gu.com/p/a".to_string(),
        };
        assert_eq!(article.link(), "https://www.theguardian.com/a");

        article.web_url.clear();
        assert_eq!(article.link(), "https://gu.com/p/a");
    }

    #[test]
    fn test_excerpt_to_text_strips_markup() {
        assert_eq!(excerpt_to_text("Plain excerpt "), "Plain excerpt");
        let text = excerpt_to_text("<strong>Bold</strong> claim about AI");
        assert!(text.contains("Bold"));
        assert!(text.contains("claim about AI"));
        assert!(!text.contains("<strong>"));
    }

    #[tokio::test]
    async fn test_search_articles_sends_query_and_maps_fields() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-key".into(), "test-key".into()),
                Matcher::UrlEncoded("q".into(), "ai OR technology".into()),
                Matcher::UrlEncoded("order-by".into(), "newest".into()),
                Matcher::UrlEncoded("show-fields".into(), "trailText,headline,shortUrl".into()),
                Matcher::UrlEncoded("page-size".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "response": {
                        "status": "ok",
                        "results": [
                            {
                                "id": "technology/2025/jan/02/newer",
                                "webUrl": "https://www.theguardian.com/technology/2025/jan/02/newer",
                                "webTitle": "Newer web title",
                                "fields": {
                                    "headline": "Newer headline",
                                    "trailText": "Newer trail",
                                    "shortUrl": "https://gu.com/p/new"
                                }
                            },
                            {
                                "id": "technology/2025/jan/01/older",
                                "webUrl": "https://www.theguardian.com/technology/2025/jan/01/older",
                                "webTitle": "Older web title"
                            }
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = GuardianClient::new("test-key", server.url()).unwrap();
        let topics = vec!["ai".to_string(), "technology".to_string()];
        let articles = client.search_articles(&topics, 2).await.unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, "technology/2025/jan/02/newer");
        assert_eq!(articles[0].headline, "Newer headline");
        assert_eq!(articles[0].short_url, "https://gu.com/p/new");
        // Missing fields fall back to the web title and web URL
        assert_eq!(articles[1].headline, "Older web title");
        assert_eq!(
            articles[1].short_url,
            "https://www.theguardian.com/technology/2025/jan/01/older"
        );

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_articles_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = GuardianClient::new("bad-key", server.url()).unwrap();
        let err = client
            .search_articles(&["ai".to_string()], 5)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_article_body_prefers_body_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/technology/2025/jan/01/story")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-key".into(), "test-key".into()),
                Matcher::UrlEncoded("show-fields".into(), "headline,trailText,bodyText".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"response": {"content": {"fields": {
                    "headline": "Story",
                    "trailText": "Short excerpt",
                    "bodyText": "  Full body. Second sentence.  "
                }}}}"#,
            )
            .create_async()
            .await;

        let client = GuardianClient::new("test-key", server.url()).unwrap();
        let body = client
            .article_body("technology/2025/jan/01/story")
            .await
            .unwrap();

        assert_eq!(body, "Full body. Second sentence.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_article_body_falls_back_to_excerpt() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/world/story")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": {"content": {"fields": {"trailText": "Only the excerpt"}}}}"#)
            .create_async()
            .await;

        let client = GuardianClient::new("test-key", server.url()).unwrap();
        let body = client.article_body("world/story").await.unwrap();

        assert_eq!(body, "Only the excerpt");
    }

    #[tokio::test]
    async fn test_article_body_empty_when_no_fields() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/world/empty")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": {"content": {}}}"#)
            .create_async()
            .await;

        let client = GuardianClient::new("test-key", server.url()).unwrap();
        let body = client.article_body("world/empty").await.unwrap();

        assert!(body.is_empty());
    }
}

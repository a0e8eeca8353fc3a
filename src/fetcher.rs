use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::article::{Article, ArticleSource, Category};
use crate::config::ProviderConfig;
use crate::error::FetchError;

/// Anything that can produce the ordered headline list for a category.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, category: Category) -> Result<Vec<Article>, FetchError>;
}

/// Client for a GNews-compatible `top-headlines` endpoint.
pub struct GNewsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    lang: String,
    country: Option<String>,
    max_articles: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopHeadlines {
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    url: String,
    #[serde(default)]
    image: Option<String>,
    published_at: String,
    #[serde(default)]
    source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: String,
    #[serde(default)]
    url: Option<String>,
}

impl GNewsClient {
    pub fn new(config: &ProviderConfig, api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("HeadlineDesk/1.0 (News Aggregator)")
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            lang: config.lang.clone(),
            country: config.country.clone(),
            max_articles: config.max_articles,
        })
    }

    /// Decode a `top-headlines` response body, keeping provider order.
    pub fn parse_articles(body: &[u8]) -> Result<Vec<Article>, FetchError> {
        let parsed: TopHeadlines = serde_json::from_slice(body).map_err(|e| {
            warn!("Could not decode provider response: {}", e);
            FetchError::MalformedResponse
        })?;

        parsed
            .articles
            .into_iter()
            .map(Self::normalize)
            .collect()
    }

    fn normalize(raw: RawArticle) -> Result<Article, FetchError> {
        let published_at = DateTime::parse_from_rfc3339(&raw.published_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                warn!("Bad publishedAt '{}' on {}: {}", raw.published_at, raw.url, e);
                FetchError::MalformedResponse
            })?;

        Ok(Article {
            title: raw.title.unwrap_or_else(|| "Untitled".to_string()),
            description: raw.description.unwrap_or_default(),
            url: raw.url,
            image_url: raw.image.filter(|img| !img.trim().is_empty()),
            published_at,
            content: raw.content,
            source: raw.source.map(|s| ArticleSource {
                name: s.name,
                url: s.url,
            }),
        })
    }
}

#[async_trait]
impl NewsSource for GNewsClient {
    async fn fetch(&self, category: Category) -> Result<Vec<Article>, FetchError> {
        info!("Fetching '{}' headlines from {}", category, self.endpoint);

        let mut request = self.client.get(&self.endpoint).query(&[
            ("token", self.api_key.as_str()),
            ("lang", self.lang.as_str()),
            ("category", category.as_str()),
        ]);
        if let Some(country) = &self.country {
            request = request.query(&[("country", country)]);
        }
        if let Some(max) = self.max_articles {
            request = request.query(&[("max", max)]);
        }

        // without_url keeps the token out of the logs
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            warn!("Request for '{}' failed: {}", category, e);
            FetchError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Provider answered '{}' with HTTP {}", category, status);
            return Err(FetchError::UpstreamError(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            let e = e.without_url();
            warn!("Reading body for '{}' failed: {}", category, e);
            FetchError::from(e)
        })?;

        let articles = Self::parse_articles(&body)?;
        info!("Fetched {} articles for '{}'", articles.len(), category);
        Ok(articles)
    }
}

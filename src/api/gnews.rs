use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const GNEWS_ENDPOINT: &str = "https://gnews.io/api/v4/top-headlines";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Headline {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl Headline {
    /// Text to fall back on when the article page cannot be scraped.
    pub fn summary(&self) -> String {
        self.description
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.content.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<Headline>,
}

pub struct GNewsClient {
    client: Client,
    token: String,
    lang: String,
    country: String,
}

impl GNewsClient {
    pub fn new(client: Client, token: impl Into<String>, lang: &str, country: &str) -> Self {
        Self {
            client,
            token: token.into(),
            lang: lang.to_string(),
            country: country.to_string(),
        }
    }

    /// First usable top headline, or `None` when the feed is empty.
    pub async fn top_headline(&self) -> Result<Option<Headline>> {
        let resp = self
            .client
            .get(GNEWS_ENDPOINT)
            .query(&[
                ("token", self.token.as_str()),
                ("lang", self.lang.as_str()),
                ("country", self.country.as_str()),
                ("max", "5"),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("GNews request failed")?
            .error_for_status()
            .context("GNews HTTP error")?;

        let body = resp.text().await.context("GNews response read failed")?;
        first_headline(&body)
    }
}

fn first_headline(body: &str) -> Result<Option<Headline>> {
    let parsed: HeadlinesResponse =
        serde_json::from_str(body).context("Failed to parse GNews response")?;
    Ok(parsed
        .articles
        .into_iter()
        .find(|a| !a.title.trim().is_empty() && !a.url.trim().is_empty()))
}

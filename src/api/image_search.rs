use super::{BROWSER_USER_AGENT, write_atomically};
use crate::logw;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
/// Custom Search returns at most ten results per request.
const CSE_MAX_NUM: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

pub struct ImageSearchClient {
    client: Client,
    api_key: String,
    cse_id: String,
}

impl ImageSearchClient {
    pub fn new(client: Client, api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            cse_id: cse_id.into(),
        }
    }

    /// Image links for `query`, minus anything hosted on `skip_domains`.
    pub async fn search(&self, query: &str, count: usize, skip_domains: &[String]) -> Result<Vec<String>> {
        let num = count.clamp(1, CSE_MAX_NUM).to_string();
        let resp = self
            .client
            .get(CSE_ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("num", num.as_str()),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("Image search request failed")?
            .error_for_status()
            .context("Image search HTTP error")?;

        let body = resp.text().await.context("Image search response read failed")?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).context("Failed to parse image search response")?;
        Ok(filter_links(parsed.items.into_iter().map(|i| i.link), skip_domains))
    }
}

fn filter_links(links: impl Iterator<Item = String>, skip_domains: &[String]) -> Vec<String> {
    links
        .filter(|link| !skip_domains.iter().any(|d| link.contains(d.as_str())))
        .collect()
}

/// Extension for an image MIME type, or `None` for types ffmpeg cannot loop
/// as a still.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !mime.starts_with("image/") {
        return None;
    }
    match mime.as_str() {
        "image/svg+xml" => None,
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        _ => Some("jpg"),
    }
}

/// Downloads an image to `stem` plus an extension taken from the response
/// Content-Type. Returns `None` for anything that is not a usable image.
pub async fn download_image(client: &Client, url: &str, stem: &Path) -> Result<Option<PathBuf>> {
    let resp = client
        .get(url)
        .header("User-Agent", BROWSER_USER_AGENT)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .with_context(|| format!("image request failed: {url}"))?;

    if !resp.status().is_success() {
        logw(format!("Image HTTP {} for {}", resp.status().as_u16(), url));
        return Ok(None);
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let Some(ext) = extension_for_mime(&content_type) else {
        logw(format!("Skipping {} (content type {:?})", url, content_type));
        return Ok(None);
    };

    let bytes = resp.bytes().await.context("image body read failed")?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let path = stem.with_extension(ext);
    write_atomically(&path, bytes.to_vec()).await?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blocked_domains() {
        let links = vec![
            "https://cdn.example.com/a.jpg".to_string(),
            "https://www.washingtonpost.com/b.jpg".to_string(),
            "https://imengine.public.prod.pdh.navigacloud.com/c.png".to_string(),
        ];
        let skip = vec!["washingtonpost.com".to_string(), "navigacloud.com".to_string()];
        assert_eq!(filter_links(links.into_iter(), &skip), ["https://cdn.example.com/a.jpg"]);
    }

    #[test]
    fn maps_mime_types() {
        assert_eq!(extension_for_mime("image/jpeg; charset=binary"), Some("jpg"));
        assert_eq!(extension_for_mime("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for_mime("image/avif"), Some("jpg"));
        assert_eq!(extension_for_mime("image/svg+xml"), None);
        assert_eq!(extension_for_mime("text/html"), None);
        assert_eq!(extension_for_mime(""), None);
    }
}

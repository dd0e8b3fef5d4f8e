use anyhow::{Context, Result};
use reqwest::Client;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

pub mod article;
pub mod gnews;
pub mod google_tts;
pub mod image_search;
pub mod pexels;
pub mod runway;
pub mod youtube;

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";

pub fn build_client() -> Result<Client> {
    Client::builder()
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

/// Writes `bytes` next to `dest` first and renames it into place, so a
/// partial download never shows up under the final name.
pub(crate) async fn write_atomically(dest: &Path, bytes: Vec<u8>) -> Result<()> {
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create dir {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(&bytes)?;
        tmp.persist(&dest)
            .with_context(|| format!("Failed to persist {}", dest.display()))?;
        Ok(())
    })
    .await?
}

/// GETs `url` and stores the body at `dest`.
pub(crate) async fn download_to(client: &Client, url: &str, dest: &Path, timeout_s: u64) -> Result<()> {
    let resp = client
        .get(url)
        .header("User-Agent", BROWSER_USER_AGENT)
        .timeout(Duration::from_secs(timeout_s))
        .send()
        .await
        .with_context(|| format!("download request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("download HTTP error: {url}"))?;
    let bytes = resp.bytes().await.context("download body read failed")?;
    write_atomically(dest, bytes.to_vec()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn atomic_write_lands_at_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("nested/file.bin");
        write_atomically(&dest, b"payload".to_vec()).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"payload");

        let leftovers = std::fs::read_dir(dest.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}

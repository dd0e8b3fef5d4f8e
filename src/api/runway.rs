use super::download_to;
use crate::{logi, logw};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const RUNWAY_BASE: &str = "https://api.runwayml.com/v1";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLLS: u32 = 120;

#[derive(Debug, Deserialize)]
struct CreatedJob {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum JobStatus {
    Succeeded { output: JobOutput },
    Failed {
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(other)]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct JobOutput {
    video: String,
}

pub struct RunwayClient {
    client: Client,
    api_key: String,
}

impl RunwayClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Generates a clip for `prompt` and stores it at `dest`.
    pub async fn generate_clip(&self, prompt: &str, max_duration: u32, dest: &Path) -> Result<()> {
        let resp = self
            .client
            .post(format!("{RUNWAY_BASE}/generations"))
            .bearer_auth(&self.api_key)
            .json(&json!({"prompt": prompt, "max_duration": max_duration}))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .context("Runway request failed")?
            .error_for_status()
            .context("Runway HTTP error")?;
        let job: CreatedJob = resp.json().await.context("Failed to parse Runway job")?;
        logi(format!("Runway job {} queued", job.id));

        let status_url = format!("{RUNWAY_BASE}/jobs/{}", job.id);
        for _ in 0..MAX_POLLS {
            let status = self.poll(&status_url).await?;
            match status {
                JobStatus::Succeeded { output } => {
                    download_to(&self.client, &output.video, dest, 120).await?;
                    return Ok(());
                }
                JobStatus::Failed { error } => {
                    anyhow::bail!("Runway generation failed: {}", error.unwrap_or_default());
                }
                JobStatus::Pending => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
        logw(format!("Runway job {} still running after {} polls", job.id, MAX_POLLS));
        anyhow::bail!("Runway generation timed out")
    }

    async fn poll(&self, url: &str) -> Result<JobStatus> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .context("Runway status request failed")?
            .error_for_status()
            .context("Runway status HTTP error")?;
        let body = resp.text().await.context("Runway status read failed")?;
        serde_json::from_str(&body).context("Failed to parse Runway status")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_states() {
        let done: JobStatus =
            serde_json::from_str(r#"{"status": "succeeded", "output": {"video": "https://r/v.mp4"}}"#).unwrap();
        assert_eq!(
            done,
            JobStatus::Succeeded {
                output: JobOutput {
                    video: "https://r/v.mp4".to_string()
                }
            }
        );

        let failed: JobStatus = serde_json::from_str(r#"{"status": "failed"}"#).unwrap();
        assert_eq!(failed, JobStatus::Failed { error: None });

        let running: JobStatus = serde_json::from_str(r#"{"status": "running", "progress": 0.4}"#).unwrap();
        assert_eq!(running, JobStatus::Pending);
    }
}

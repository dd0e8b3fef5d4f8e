use crate::narration::{MAX_TTS_CHUNK_BYTES, Narrator, chunk_for_tts};
use crate::{logi, logok};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

pub struct GoogleTts {
    client: Client,
    api_key: String,
    language_code: String,
    voice: String,
}

impl GoogleTts {
    pub fn new(client: Client, api_key: impl Into<String>, language_code: &str, voice: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            language_code: language_code.to_string(),
            voice: voice.to_string(),
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>> {
        let body = json!({
            "input": {"text": text},
            "voice": {"languageCode": self.language_code, "name": self.voice},
            "audioConfig": {"audioEncoding": "MP3"},
        });

        let resp = self
            .client
            .post(TTS_ENDPOINT)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .context("Google TTS request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet = raw.chars().take(400).collect::<String>();
            anyhow::bail!("Google TTS HTTP {}: {}", status.as_u16(), snippet);
        }
        decode_audio(&raw)
    }
}

fn decode_audio(raw: &str) -> Result<Vec<u8>> {
    let parsed: SynthesizeResponse =
        serde_json::from_str(raw).context("Failed to parse Google TTS response")?;
    STANDARD
        .decode(parsed.audio_content.as_bytes())
        .context("Google TTS audioContent is not valid base64")
}

#[async_trait]
impl Narrator for GoogleTts {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()> {
        let chunks = chunk_for_tts(text, MAX_TTS_CHUNK_BYTES);
        if chunks.is_empty() {
            anyhow::bail!("nothing to narrate");
        }

        // mp3 chunks are appended frame-for-frame
        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            logi(format!("Synthesizing chunk {}/{} ({} bytes)", i + 1, chunks.len(), chunk.len()));
            audio.extend(self.synthesize_chunk(chunk).await?);
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        fs::write(out_path, &audio)
            .await
            .with_context(|| format!("Failed to write {}", out_path.display()))?;
        logok(format!("Voiceover saved: {} ({} bytes, voice {})", out_path.display(), audio.len(), self.voice));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_audio_content() {
        let raw = r#"{"audioContent": "SUQzBAA="}"#;
        assert_eq!(decode_audio(raw).unwrap(), b"ID3\x04\x00");
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(decode_audio(r#"{"audioContent": "***"}"#).is_err());
        assert!(decode_audio(r#"{"error": {"code": 403}}"#).is_err());
    }
}

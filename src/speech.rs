//! Voice preview: OpenAI text-to-speech behind a profanity pre-check.

use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::config::SpeechConfig;
use crate::error::SpeechError;

const TTS_URL: &str = "https://api.openai.com/v1/audio/speech";
const TTS_MODEL: &str = "tts-1";
const PROFANITY_URL: &str = "https://api.api-ninjas.com/v1/profanityfilter";

pub struct SpeechService {
    http: reqwest::Client,
    config: SpeechConfig,
}

impl SpeechService {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Profanity pre-check for preview text. Fails open: a missing key or a
    /// provider outage never blocks a preview.
    pub async fn is_text_appropriate(&self, text: &str) -> bool {
        let Some(key) = &self.config.profanity_api_key else {
            return true;
        };

        let response = self
            .http
            .get(PROFANITY_URL)
            .query(&[("text", text)])
            .header("X-Api-Key", key.expose_secret())
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => match r.json::<Value>().await {
                Ok(body) => !body
                    .get("has_profanity")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                Err(_) => true,
            },
            Ok(r) => {
                tracing::warn!(status = %r.status(), "Profanity check returned an error; allowing text");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profanity check unreachable; allowing text");
                true
            }
        }
    }

    /// Synthesize MP3 audio for a short preview phrase.
    pub async fn generate_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
        let Some(key) = &self.config.openai_api_key else {
            return Err(SpeechError::NotConfigured);
        };

        let response = self
            .http
            .post(TTS_URL)
            .bearer_auth(key.expose_secret())
            .json(&json!({
                "model": TTS_MODEL,
                "input": text,
                "voice": voice,
            }))
            .send()
            .await
            .map_err(|e| SpeechError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpeechError::Generation(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Generation(e.to_string()))?;
        Ok(audio.to_vec())
    }
}

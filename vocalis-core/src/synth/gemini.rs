//! Gemini TTS backend over blocking HTTPS.
//!
//! One `generateContent` call per request, audio modality only. The service
//! answers with base64 PCM16 (24 kHz mono) in `inlineData`, which maps
//! straight onto [`EncodedPayload`]. Safety-filter refusals are surfaced as
//! `VocalisError::SafetyRejected`, distinct from transport failures, so the
//! host can show the user why nothing came back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::decode::EncodedPayload;
use crate::error::{Result, VocalisError};
use crate::synth::{SpeechSynthesizer, SynthesisRequest};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Finish reasons the service uses for refused prompts.
const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            endpoint: DEFAULT_ENDPOINT.into(),
        }
    }
}

/// Blocking client for the Gemini speech-generation endpoint.
pub struct GeminiSynthesizer {
    config: GeminiConfig,
    client: reqwest::blocking::Client,
}

impl GeminiSynthesizer {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VocalisError::Transport(format!("http client init: {e}")))?;
        Ok(Self { config, client })
    }
}

impl SpeechSynthesizer for GeminiSynthesizer {
    fn synthesize(&mut self, request: &SynthesisRequest) -> Result<EncodedPayload> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, self.config.model
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &request.voice_name,
                        },
                    },
                },
            },
        };

        debug!(model = self.config.model.as_str(), "requesting speech generation");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| VocalisError::Transport(format!("generation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            warn!(%status, "generation service returned an error");
            return Err(VocalisError::Transport(format!(
                "generation service returned {status}: {detail}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| VocalisError::Transport(format!("unreadable response: {e}")))?;

        extract_payload(parsed)
    }
}

/// Pull the audio payload out of a parsed response, mapping refusals and
/// empty answers onto the error taxonomy.
fn extract_payload(response: GenerateResponse) -> Result<EncodedPayload> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(VocalisError::SafetyRejected(format!(
                "prompt blocked: {reason}"
            )));
        }
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(VocalisError::Transport(
            "no candidates in generation response".into(),
        ));
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return Err(VocalisError::SafetyRejected(format!(
                "generation stopped: {reason}"
            )));
        }
    }

    let payload = candidate
        .content
        .into_iter()
        .flat_map(|content| content.parts)
        .find_map(|part| part.inline_data)
        .map(|inline| inline.data)
        .filter(|data| !data.is_empty());

    match payload {
        Some(data) => Ok(EncodedPayload::new(data)),
        None => Err(VocalisError::Transport(
            "generation response carried no audio payload".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'a str>,
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CandidatePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct InlineData {
    data: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

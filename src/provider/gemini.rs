//! Gemini REST client for image and speech generation.
//!
//! Talks to the `generateContent` endpoint of the Generative Language
//! API. See: <https://ai.google.dev/api/generate-content>
//!
//! The broker never inspects error strings — this client maps transport
//! and API failures onto the structured
//! [`ShowreelError`](crate::ShowreelError) taxonomy (429 → `RateLimited`,
//! safety blocks → `ContentFiltered`, and so on) at the boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::MediaProvider;
use crate::types::AspectRatio;
use crate::{Result, ShowreelError};

/// Default base URL for the Generative Language API.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default image model.
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Default speech model.
const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Default narration voice.
const DEFAULT_VOICE: &str = "Charon";

/// House style wrapped around every image prompt.
const DEFAULT_STYLE_PREFIX: &str = "Cinematic film still, 35mm anamorphic. ";
const DEFAULT_STYLE_SUFFIX: &str =
    ". High contrast, deep noir shadows, atmospheric, masterpiece quality.";

/// Client for the Gemini generateContent API.
///
/// Supports:
/// - Still-image generation (payload returned as a `data:` URI)
/// - Short narrated speech (payload returned as raw base64)
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    http: Client,
    base_url: String,
    image_model: String,
    speech_model: String,
    voice: String,
    style_prefix: String,
    style_suffix: String,
    timeout: Duration,
}

impl GeminiProvider {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            http: Client::new(),
            base_url: base_url.into(),
            image_model: DEFAULT_IMAGE_MODEL.to_owned(),
            speech_model: DEFAULT_SPEECH_MODEL.to_owned(),
            voice: DEFAULT_VOICE.to_owned(),
            style_prefix: DEFAULT_STYLE_PREFIX.to_owned(),
            style_suffix: DEFAULT_STYLE_SUFFIX.to_owned(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Override the per-attempt timeout (default: 60s).
    ///
    /// Bounds how long a single hung call can block the serialized queue.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Override the image model.
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Override the speech model.
    pub fn speech_model(mut self, model: impl Into<String>) -> Self {
        self.speech_model = model.into();
        self
    }

    /// Override the narration voice.
    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Override the house style wrapped around image prompts. Pass empty
    /// strings to send prompts verbatim.
    pub fn style(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.style_prefix = prefix.into();
        self.style_suffix = suffix.into();
        self
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| ShowreelError::Http(e.to_string()))?;

        self.handle_response_errors(&response)?;

        response
            .json()
            .await
            .map_err(|e| ShowreelError::Http(e.to_string()))
    }

    /// Check response status and map to the appropriate error.
    fn handle_response_errors(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(ShowreelError::AuthenticationFailed),
            429 => {
                // Try to parse retry-after header
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(ShowreelError::RateLimited { retry_after })
            }
            code => Err(ShowreelError::Api {
                status: code,
                message: format!("Gemini API error: {}", status),
            }),
        }
    }
}

#[async_trait]
impl MediaProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_image(&self, prompt: &str, aspect: AspectRatio) -> Result<String> {
        let styled = format!("{}{}{}", self.style_prefix, prompt, self.style_suffix);
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: &styled }],
            }],
            generation_config: GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: aspect.as_str(),
                }),
                response_modalities: None,
                speech_config: None,
            },
        };

        let response = self.generate_content(&self.image_model, &request).await?;
        let inline = response.into_inline_data()?;
        let mime = inline.mime_type.as_deref().unwrap_or("image/png");
        Ok(format!("data:{};base64,{}", mime, inline.data))
    }

    async fn generate_speech(&self, text: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig {
                image_config: None,
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: &self.voice },
                    },
                }),
            },
        };

        let response = self.generate_content(&self.speech_model, &request).await?;
        Ok(response.into_inline_data()?.data)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
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
struct GenerationConfig<'a> {
    #[serde(rename = "imageConfig", skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'a str>>,
    #[serde(rename = "speechConfig", skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Serialize)]
struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: &'static str,
}

#[derive(Serialize)]
struct SpeechConfig<'a> {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
struct VoiceConfig<'a> {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
struct PrebuiltVoiceConfig<'a> {
    #[serde(rename = "voiceName")]
    voice_name: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Extract the first inline media part, classifying safety blocks.
    fn into_inline_data(self) -> Result<InlineData> {
        if let Some(feedback) = &self.prompt_feedback
            && let Some(reason) = &feedback.block_reason
        {
            return Err(ShowreelError::ContentFiltered {
                reason: reason.clone(),
            });
        }

        let mut filtered_reason = None;
        for candidate in self.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(inline) = part.inline_data {
                        return Ok(inline);
                    }
                }
            }
            match candidate.finish_reason.as_deref() {
                Some(reason @ ("SAFETY" | "IMAGE_SAFETY" | "PROHIBITED_CONTENT")) => {
                    filtered_reason = Some(reason.to_owned());
                }
                _ => {}
            }
        }

        match filtered_reason {
            Some(reason) => Err(ShowreelError::ContentFiltered { reason }),
            None => Err(ShowreelError::EmptyResponse),
        }
    }
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    data: String,
}

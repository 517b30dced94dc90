//! OpenAI chat-completions vision client.

use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::error::VisionError;
use crate::vision::prompts::{SYSTEM_PROMPT, USER_PROMPT};
use crate::vision::{ImageInput, VisionAnalyzer, VisionConfig};

const PROVIDER: &str = "openai";

/// Response budget for the description.
const MAX_TOKENS: u32 = 500;

const TEMPERATURE: f32 = 0.7;

/// Vision analyzer backed by OpenAI chat completions.
pub struct OpenAiVision {
    config: VisionConfig,
    client: reqwest::Client,
}

impl OpenAiVision {
    pub fn new(config: VisionConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Build the request body: fixed system prompt, user prompt and an
    /// inline base64 data URL.
    fn build_payload(&self, image: &ImageInput) -> Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let data_url = format!("data:{};base64,{}", image.mime_type, encoded);

        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        {
                            "type": "image_url",
                            "image_url": { "url": data_url, "detail": "high" }
                        }
                    ]
                }
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        })
    }
}

#[async_trait]
impl VisionAnalyzer for OpenAiVision {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    async fn analyze(&self, image: ImageInput) -> Result<String, VisionError> {
        let payload = self.build_payload(&image);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| VisionError::RequestFailed {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        let analysis = extract_content(&body)?;
        tracing::info!(chars = analysis.len(), "Successfully analyzed image");
        Ok(analysis)
    }
}

fn map_status_error(status: StatusCode, body: String) -> VisionError {
    match status {
        StatusCode::UNAUTHORIZED => VisionError::AuthFailed {
            provider: PROVIDER.into(),
        },
        StatusCode::TOO_MANY_REQUESTS => VisionError::RateLimited {
            provider: PROVIDER.into(),
        },
        _ => VisionError::Http {
            provider: PROVIDER.into(),
            status: status.as_u16(),
            body,
        },
    }
}

/// Pull `choices[0].message.content`; missing or blank is an empty result.
fn extract_content(body: &Value) -> Result<String, VisionError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");

    if content.is_empty() {
        return Err(VisionError::EmptyResult {
            provider: PROVIDER.into(),
        });
    }
    Ok(content.to_string())
}

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::core::{
    errors::{AppError, AppResult},
    types::Provider,
};
use crate::detection::PageRaster;
use crate::extraction::{FieldBand, FieldExtractor, FieldRequest, FieldText};
use crate::security::keyring;

/// Pixels added around a detected cell before it is sent for reading.
const CROP_MARGIN: u32 = 6;

/// Reads handwritten petition fields through the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Network(err.to_string()))?;
        Ok(Self {
            http,
            model: model.into(),
            api_key: None,
        })
    }

    /// Uses `api_key` instead of the key stored in the OS keyring.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn resolve_api_key(&self) -> AppResult<String> {
        match &self.api_key {
            Some(key) => Ok(key.clone()),
            None => keyring::get_provider_key(Provider::Gemini),
        }
    }

    async fn read_field(&self, api_key: &str, prompt: &str, png: &[u8]) -> AppResult<FieldText> {
        let endpoint = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, api_key
        );
        let payload = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        {"text": prompt},
                        {
                            "inline_data": {
                                "mime_type": "image/png",
                                "data": STANDARD.encode(png)
                            }
                        }
                    ]
                }
            ],
            "generationConfig": {
                "temperature": 0.0,
                "responseMimeType": "application/json"
            }
        });

        let response = self
            .http
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::ProviderTimeout
                } else {
                    AppError::Network(err.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(AppError::ProviderAuth),
            StatusCode::TOO_MANY_REQUESTS => return Err(AppError::ProviderRateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ProviderInvalidResponse(format!(
                    "status {status} body {body}"
                )));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| AppError::ProviderInvalidResponse(err.to_string()))?;
        parse_field_response(&body)
    }
}

#[async_trait]
impl FieldExtractor for GeminiClient {
    async fn extract(&self, page: &PageRaster, request: &FieldRequest) -> AppResult<FieldText> {
        let api_key = self.resolve_api_key()?;
        let region = request
            .region
            .expanded(CROP_MARGIN, page.width(), page.height());
        let png = page.crop_png(&region)?;
        debug!(
            page = request.page_number,
            row = request.row,
            band = request.band.as_str(),
            bytes = png.len(),
            "requesting field transcription"
        );
        self.read_field(&api_key, field_prompt(request.band), &png)
            .await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn field_prompt(band: FieldBand) -> &'static str {
    match band {
        FieldBand::Name => {
            "The image is one cell of a New York petition signature sheet holding a \
             signer's printed or handwritten name. Transcribe the name exactly as written. \
             Respond with JSON {\"text\": string, \"confidence\": number between 0 and 1}. \
             Use an empty string when the cell is blank or illegible."
        }
        FieldBand::Address => {
            "The image is one cell of a New York petition signature sheet holding a \
             signer's residence address. Transcribe it as \"number street, borough\". \
             Respond with JSON {\"text\": string, \"confidence\": number between 0 and 1}. \
             Use an empty string when the cell is blank or illegible."
        }
    }
}

/// Pulls `{"text", "confidence"}` out of a `generateContent` response body.
fn parse_field_response(body: &Value) -> AppResult<FieldText> {
    let text = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|items: &Vec<Value>| items.first())
        .and_then(|item: &Value| item.get("content"))
        .and_then(|content: &Value| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts: &Vec<Value>| parts.first())
        .and_then(|part: &Value| part.get("text"))
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::ProviderInvalidResponse("missing text candidate".to_string()))?;

    let parsed: Value = serde_json::from_str(text).map_err(|err| {
        AppError::ProviderInvalidResponse(format!("model output not JSON: {err}"))
    })?;
    let transcription = parsed
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::ProviderInvalidResponse("model output missing text".to_string()))?
        .trim()
        .to_string();
    let confidence = parsed
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5);

    Ok(FieldText::new(transcription, confidence))
}

//! Chat-completions style image API over libcurl.
//!
//! Synthesis: `POST {api_url}/chat/completions` with `modalities`, image comes
//! back as a data URL in `choices[0].message.images[0].image_url.url`.
//! Credits: `GET {api_url}/credits`. curl is blocking, so each call runs on
//! `spawn_blocking`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{
    CreditBalance, ImageProvider, Modality, ProviderError, SynthesisRequest, SynthesisResponse,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CREDITS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpProvider {
    api_url: String,
    model: String,
    api_key: Option<String>,
    modality: Modality,
    /// Whole-transfer bound for synthesis calls; `None` waits indefinitely.
    request_timeout: Option<Duration>,
    /// Whole-transfer bound for the credits query. Always set, since a timed-out
    /// caller does not stop the blocking transfer.
    credits_timeout: Duration,
}

impl HttpProvider {
    pub fn new(
        api_url: &str,
        model: &str,
        api_key: Option<String>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            modality: Modality::default(),
            request_timeout,
            credits_timeout: DEFAULT_CREDITS_TIMEOUT,
        }
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn with_credits_timeout(mut self, timeout: Duration) -> Self {
        self.credits_timeout = timeout;
        self
    }

    fn request_body(&self, request: &SynthesisRequest) -> Result<Vec<u8>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "modalities": self.modality.as_wire(),
        });
        serde_json::to_vec(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn call(
        &self,
        url: String,
        body: Option<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, ProviderError> {
        let api_key = self.api_key.clone();
        tokio::task::spawn_blocking(move || perform(&url, api_key.as_deref(), body, timeout))
            .await
            .map_err(|e| ProviderError::Network(format!("request task failed: {}", e)))?
    }
}

/// Blocking HTTP exchange. Returns the body of a 2xx response.
fn perform(
    url: &str,
    api_key: Option<&str>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ProviderError> {
    let mut response = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    if let Some(t) = timeout {
        easy.timeout(t)?;
    }

    let mut headers = curl::easy::List::new();
    headers.append("Content-Type: application/json")?;
    if let Some(key) = api_key {
        headers.append(&format!("Authorization: Bearer {}", key.trim()))?;
    }
    easy.http_headers(headers)?;

    if let Some(body) = body {
        easy.post(true)?;
        easy.post_fields_copy(&body)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(ProviderError::from_status(code, error_message(&response)));
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.message.is_empty() => env.error.message,
        _ => String::from_utf8_lossy(body).chars().take(200).collect(),
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    images: Vec<ImagePart>,
}

#[derive(Debug, Deserialize)]
struct ImagePart {
    image_url: ImageUrl,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}

/// Extract the first image from a 2xx chat-completions body.
///
/// Some gateways report failures inside a 200 body as `{"error": {...}}`.
pub(crate) fn parse_synthesis(body: &[u8]) -> Result<SynthesisResponse, ProviderError> {
    if let Ok(env) = serde_json::from_slice::<ErrorEnvelope>(body) {
        let status = env.error.code.unwrap_or(500);
        return Err(ProviderError::from_status(status, env.error.message));
    }
    let parsed: ChatResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    let url = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.images.into_iter().next())
        .map(|img| img.image_url.url)
        .ok_or(ProviderError::MissingImage)?;
    let mime_type = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(';'))
        .map(|(mime, _)| mime.to_string());
    Ok(SynthesisResponse { data: url, mime_type })
}

#[derive(Debug, Deserialize)]
struct CreditsEnvelope {
    data: CreditsData,
}

#[derive(Debug, Deserialize)]
struct CreditsData {
    total_credits: f64,
    #[serde(default)]
    total_usage: f64,
}

pub(crate) fn parse_credits(body: &[u8]) -> Result<CreditBalance, ProviderError> {
    let env: CreditsEnvelope = serde_json::from_slice(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    Ok(CreditBalance {
        total: env.data.total_credits,
        used: env.data.total_usage,
    })
}

#[async_trait]
impl ImageProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = self.request_body(request)?;
        tracing::debug!(label = %request.label, model = %self.model, "synthesis request");
        let response = self.call(url, Some(body), self.request_timeout).await?;
        parse_synthesis(&response)
    }

    async fn credits(&self) -> Result<CreditBalance, ProviderError> {
        let url = format!("{}/credits", self.api_url);
        let response = self.call(url, None, Some(self.credits_timeout)).await?;
        parse_credits(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_from_choices() {
        let body = br#"{"choices":[{"message":{"content":"ok","images":[
            {"type":"image_url","image_url":{"url":"data:image/png;base64,aGk="}}]}}]}"#;
        let r = parse_synthesis(body).unwrap();
        assert_eq!(r.mime_type.as_deref(), Some("image/png"));
        assert_eq!(r.decode().unwrap(), b"hi");
    }

    #[test]
    fn no_images_is_missing_image() {
        let body = br#"{"choices":[{"message":{"content":"sorry, text only"}}]}"#;
        assert_eq!(parse_synthesis(body), Err(ProviderError::MissingImage));
        assert_eq!(parse_synthesis(br#"{"choices":[]}"#), Err(ProviderError::MissingImage));
    }

    #[test]
    fn error_in_ok_body_is_mapped() {
        let body = br#"{"error":{"code":402,"message":"Insufficient credits"}}"#;
        assert!(matches!(parse_synthesis(body), Err(ProviderError::Quota(_))));
        let body = br#"{"error":{"code":401,"message":"No auth credentials found"}}"#;
        assert!(matches!(parse_synthesis(body), Err(ProviderError::Auth(_))));
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        assert!(matches!(
            parse_synthesis(b"<html>"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parses_credits() {
        let body = br#"{"data":{"total_credits":10.5,"total_usage":2.5}}"#;
        let c = parse_credits(body).unwrap();
        assert_eq!(c.remaining(), 8.0);
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(error_message(br#"{"error":{"message":"bad key"}}"#), "bad key");
        assert_eq!(error_message(b"plain"), "plain");
    }

    #[test]
    fn request_body_carries_model_and_modalities() {
        let p = HttpProvider::new("https://api.example/v1/", "m1", None, None);
        assert_eq!(p.api_url, "https://api.example/v1");
        let req = SynthesisRequest {
            label: "x-hero.png".to_string(),
            prompt: "a cat.".to_string(),
            width: 1200,
            height: 675,
        };
        let body: serde_json::Value = serde_json::from_slice(&p.request_body(&req).unwrap()).unwrap();
        assert_eq!(body["model"], "m1");
        assert_eq!(body["messages"][0]["content"], "a cat.");
        assert_eq!(body["modalities"], serde_json::json!(["image", "text"]));

        let p = p.with_modality(Modality::Image);
        let body: serde_json::Value = serde_json::from_slice(&p.request_body(&req).unwrap()).unwrap();
        assert_eq!(body["modalities"], serde_json::json!(["image"]));
    }
}

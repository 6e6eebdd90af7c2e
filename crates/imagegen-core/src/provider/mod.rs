//! Image synthesis providers.
//!
//! The pipeline only sees `ImageProvider`. `HttpProvider` talks to a
//! chat-completions style image API; `MockProvider` is an offline stand-in for
//! tests and dry runs.

mod error;
mod http;
mod mock;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use mock::{MockBehavior, MockProvider, PLACEHOLDER_PNG};

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ProviderConfig, ProviderKind};

/// Output modalities requested from the provider (`provider.modality`).
///
/// Some models refuse image-only output and must be asked for `image_and_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Image,
    #[default]
    ImageAndText,
}

impl Modality {
    pub fn as_wire(self) -> &'static [&'static str] {
        match self {
            Modality::Image => &["image"],
            Modality::ImageAndText => &["image", "text"],
        }
    }
}

/// One synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Identifies the job in logs and mock scripts (the output filename).
    pub label: String,
    /// Final prompt, hints included.
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

/// Encoded image returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResponse {
    /// Base64 payload, optionally wrapped in a `data:` URL.
    pub data: String,
    pub mime_type: Option<String>,
}

impl SynthesisResponse {
    /// Decode the payload to raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, ProviderError> {
        let payload = match self.data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(ProviderError::MissingImage);
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ProviderError::InvalidResponse(format!("base64: {}", e)))
    }
}

/// Remaining budget as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditBalance {
    pub total: f64,
    pub used: f64,
}

impl CreditBalance {
    pub fn remaining(&self) -> f64 {
        self.total - self.used
    }
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    /// One network attempt. No retries here; see `retry::run_with_retry`.
    async fn synthesize(&self, request: &SynthesisRequest)
        -> Result<SynthesisResponse, ProviderError>;

    /// Best-effort credits introspection.
    async fn credits(&self) -> Result<CreditBalance, ProviderError>;
}

/// Build the provider selected by `[provider] kind`.
///
/// `credits_timeout` bounds the credits transfer itself, not only the await on it.
pub fn create_provider(
    cfg: &ProviderConfig,
    api_key: Option<&str>,
    credits_timeout: Duration,
) -> Arc<dyn ImageProvider> {
    match cfg.kind {
        ProviderKind::Http => Arc::new(
            HttpProvider::new(
                &cfg.api_url,
                &cfg.model,
                api_key.map(str::to_string),
                cfg.request_timeout_secs.map(Duration::from_secs),
            )
            .with_modality(cfg.modality)
            .with_credits_timeout(credits_timeout),
        ),
        ProviderKind::Mock => Arc::new(MockProvider::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_and_data_url() {
        let plain = SynthesisResponse { data: "aGk=".to_string(), mime_type: None };
        assert_eq!(plain.decode().unwrap(), b"hi");
        let url = SynthesisResponse {
            data: "data:image/png;base64,aGk=".to_string(),
            mime_type: Some("image/png".to_string()),
        };
        assert_eq!(url.decode().unwrap(), b"hi");
    }

    #[test]
    fn decode_empty_is_missing_image() {
        let r = SynthesisResponse { data: "data:image/png;base64,".to_string(), mime_type: None };
        assert_eq!(r.decode(), Err(ProviderError::MissingImage));
    }

    #[test]
    fn decode_garbage_is_invalid() {
        let r = SynthesisResponse { data: "!!!".to_string(), mime_type: None };
        assert!(matches!(r.decode(), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn create_provider_by_kind() {
        let mut cfg = ProviderConfig::default();
        let t = Duration::from_secs(1);
        assert_eq!(create_provider(&cfg, Some("k"), t).name(), "http");
        cfg.kind = ProviderKind::Mock;
        assert_eq!(create_provider(&cfg, None, t).name(), "mock");
    }

    #[test]
    fn modality_wire_names() {
        let m: Modality = serde_json::from_str(r#""image""#).unwrap();
        assert_eq!(m.as_wire(), &["image"]);
        let m: Modality = serde_json::from_str(r#""image_and_text""#).unwrap();
        assert_eq!(m, Modality::default());
    }
}

//! Offline provider: returns a 1x1 PNG, or a scripted failure per label.

use async_trait::async_trait;
use base64::Engine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{CreditBalance, ImageProvider, ProviderError, SynthesisRequest, SynthesisResponse};

/// Smallest valid PNG (1x1, transparent).
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// What the mock does when asked for a given label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    Succeed,
    /// Always reject the credential.
    Auth,
    /// Always report exhausted credits.
    Quota,
    /// Fail with a network error this many times, then succeed.
    Transient(u32),
    /// Always answer 200 without an image.
    MissingImage,
}

#[derive(Debug)]
pub struct MockProvider {
    script: Mutex<HashMap<String, MockBehavior>>,
    attempts: Mutex<HashMap<String, u32>>,
    latency: Duration,
    /// `None` makes the credits query fail.
    credits: Option<f64>,
    credits_delay: Duration,
    calls: AtomicUsize,
    credit_queries: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            credits: Some(1_000.0),
            credits_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            credit_queries: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_credits(mut self, credits: Option<f64>) -> Self {
        self.credits = credits;
        self
    }

    pub fn with_credits_delay(mut self, delay: Duration) -> Self {
        self.credits_delay = delay;
        self
    }

    /// Script the behavior for one label (output filename).
    pub fn script(self, label: &str, behavior: MockBehavior) -> Self {
        self.set_behavior(label, behavior);
        self
    }

    pub fn set_behavior(&self, label: &str, behavior: MockBehavior) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label.to_string(), behavior);
    }

    /// Total synthesis calls, every attempt counted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, label: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .copied()
            .unwrap_or(0)
    }

    pub fn credit_queries(&self) -> usize {
        self.credit_queries.load(Ordering::SeqCst)
    }

    /// Highest number of synthesis calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behavior(&self, label: &str) -> MockBehavior {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .copied()
            .unwrap_or(MockBehavior::Succeed)
    }

    fn bump_attempt(&self, label: &str) -> u32 {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let n = attempts.entry(label.to_string()).or_insert(0);
        *n += 1;
        *n
    }
}

#[async_trait]
impl ImageProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = self.bump_attempt(&request.label);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behavior(&request.label) {
            MockBehavior::Auth => Err(ProviderError::Auth("mock: invalid API key".to_string())),
            MockBehavior::Quota => Err(ProviderError::Quota("mock: no credits".to_string())),
            MockBehavior::MissingImage => Err(ProviderError::MissingImage),
            MockBehavior::Transient(n) if attempt <= n => {
                Err(ProviderError::Network("mock: connection reset".to_string()))
            }
            MockBehavior::Transient(_) | MockBehavior::Succeed => Ok(SynthesisResponse {
                data: format!(
                    "data:image/png;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(PLACEHOLDER_PNG)
                ),
                mime_type: Some("image/png".to_string()),
            }),
        }
    }

    async fn credits(&self) -> Result<CreditBalance, ProviderError> {
        self.credit_queries.fetch_add(1, Ordering::SeqCst);
        if !self.credits_delay.is_zero() {
            tokio::time::sleep(self.credits_delay).await;
        }
        match self.credits {
            Some(total) => Ok(CreditBalance { total, used: 0.0 }),
            None => Err(ProviderError::Network("mock: credits endpoint unavailable".to_string())),
        }
    }
}

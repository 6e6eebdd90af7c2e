//! `HttpProvider` against a local fake of the image API.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::api_server::{self, ApiServerOptions};
use common::{scenario_manifest, Fixture};
use imagegen_core::provider::{
    HttpProvider, ImageProvider, ProviderError, SynthesisRequest, PLACEHOLDER_PNG,
};
use imagegen_core::state::GenerationStatus;
use imagegen_core::{GenerateOptions, Pipeline};

fn provider(base_url: &str) -> HttpProvider {
    HttpProvider::new(
        base_url,
        "test-model",
        Some("test-key".to_string()),
        Some(Duration::from_secs(10)),
    )
}

fn request() -> SynthesisRequest {
    SynthesisRequest {
        label: "x-hero.png".to_string(),
        prompt: "a cat. Aspect ratio 16:9 (1200x675 pixels).".to_string(),
        width: 1200,
        height: 675,
    }
}

#[tokio::test]
async fn synthesize_returns_decodable_png() {
    let server = api_server::start(PLACEHOLDER_PNG, ApiServerOptions::default());
    let p = provider(&server.base_url);
    let response = p.synthesize(&request()).await.unwrap();
    assert_eq!(response.mime_type.as_deref(), Some("image/png"));
    assert_eq!(response.decode().unwrap(), PLACEHOLDER_PNG);
    assert_eq!(server.chat_requests(), 1);
    assert_eq!(server.authorized_requests(), 1);
}

#[tokio::test]
async fn status_codes_map_to_typed_errors() {
    for status in [401u16, 402, 429, 503] {
        let server = api_server::start(
            PLACEHOLDER_PNG,
            ApiServerOptions { chat_status: status, ..ApiServerOptions::default() },
        );
        let err = provider(&server.base_url).synthesize(&request()).await.unwrap_err();
        let mapped = match status {
            401 => matches!(err, ProviderError::Auth(_)),
            402 => matches!(err, ProviderError::Quota(_)),
            429 => err == ProviderError::RateLimited,
            _ => matches!(err, ProviderError::Http { status: 503, .. }),
        };
        assert!(mapped, "status {} gave {:?}", status, err);
    }
}

#[tokio::test]
async fn text_only_answer_is_missing_image() {
    let server = api_server::start(
        PLACEHOLDER_PNG,
        ApiServerOptions { include_image: false, ..ApiServerOptions::default() },
    );
    let err = provider(&server.base_url).synthesize(&request()).await.unwrap_err();
    assert_eq!(err, ProviderError::MissingImage);
}

#[tokio::test]
async fn credits_reports_remaining_balance() {
    let server = api_server::start(
        PLACEHOLDER_PNG,
        ApiServerOptions { total_credits: 5.0, total_usage: 1.5, ..ApiServerOptions::default() },
    );
    let balance = provider(&server.base_url).credits().await.unwrap();
    assert_eq!(balance.remaining(), 3.5);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Bind then drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let p = provider(&format!("http://127.0.0.1:{}", port));
    assert!(matches!(p.credits().await, Err(ProviderError::Network(_))));
}

#[tokio::test]
async fn credits_transfer_is_bounded_without_request_timeout() {
    let base_url = api_server::start_stalled();
    let p = HttpProvider::new(&base_url, "test-model", Some("test-key".to_string()), None)
        .with_credits_timeout(Duration::from_secs(1));
    let started = Instant::now();
    assert!(matches!(p.credits().await, Err(ProviderError::Network(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn stalled_credits_endpoint_does_not_block_runtime_shutdown() {
    let base_url = api_server::start_stalled();
    let fx = Fixture::new(1);
    fx.write_manifest("x", &scenario_manifest());
    let mut settings = fx.settings.clone();
    settings.preflight_timeout = Duration::from_secs(1);
    let provider = HttpProvider::new(&base_url, "test-model", Some("test-key".to_string()), None)
        .with_credits_timeout(settings.preflight_timeout);

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(async {
            Pipeline::new(settings, Arc::new(provider)).preflight("x").await
        });
        drop(rt);
        let _ = tx.send(result);
    });

    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("runtime did not shut down")
        .unwrap();
    assert!(result.ok());
    assert!(result.warning.is_some());
}

#[tokio::test]
async fn scenario_a_over_http() {
    let server = api_server::start(PLACEHOLDER_PNG, ApiServerOptions::default());
    let fx = Fixture::new(2);
    fx.write_manifest("x", &scenario_manifest());
    let pipeline = Pipeline::new(fx.settings.clone(), Arc::new(provider(&server.base_url)));

    let report = pipeline.generate("x", GenerateOptions::default()).await.unwrap();
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.state.status, GenerationStatus::Complete);
    assert_eq!(server.chat_requests(), 2);
    let written = std::fs::read(fx.output_dir("x").join("x-hero.png")).unwrap();
    assert_eq!(written, PLACEHOLDER_PNG);
}

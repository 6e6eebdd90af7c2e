//! Minimal HTTP/1.1 server that imitates the image API for integration tests.
//!
//! `POST /chat/completions` answers with a data-URL PNG (or a scripted error
//! status); `GET /credits` answers with a fixed balance.

use base64::Engine;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct ApiServerOptions {
    /// Status for `/chat/completions`; anything but 200 returns an error body.
    pub chat_status: u16,
    /// If false, a 200 chat response carries text only.
    pub include_image: bool,
    /// Status for `/credits`.
    pub credits_status: u16,
    pub total_credits: f64,
    pub total_usage: f64,
}

impl Default for ApiServerOptions {
    fn default() -> Self {
        Self {
            chat_status: 200,
            include_image: true,
            credits_status: 200,
            total_credits: 10.0,
            total_usage: 1.0,
        }
    }
}

/// Handle to a running server.
#[derive(Debug, Clone)]
pub struct ApiServer {
    pub base_url: String,
    chat_requests: Arc<AtomicUsize>,
    authorized_requests: Arc<AtomicUsize>,
}

impl ApiServer {
    pub fn chat_requests(&self) -> usize {
        self.chat_requests.load(Ordering::SeqCst)
    }

    /// Requests that carried `Authorization: Bearer ...`.
    pub fn authorized_requests(&self) -> usize {
        self.authorized_requests.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `png`. Runs until the process exits.
pub fn start(png: &[u8], opts: ApiServerOptions) -> ApiServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let image_url = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    );
    let server = ApiServer {
        base_url: format!("http://127.0.0.1:{}", port),
        chat_requests: Arc::new(AtomicUsize::new(0)),
        authorized_requests: Arc::new(AtomicUsize::new(0)),
    };
    let handle = server.clone();
    let image_url = Arc::new(image_url);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let image_url = Arc::clone(&image_url);
            let handle = handle.clone();
            thread::spawn(move || serve(stream, &image_url, opts, &handle));
        }
    });
    server
}

/// Starts a server that accepts connections and never answers. Returns its base URL.
pub fn start_stalled() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// Read the request head plus `Content-Length` bytes of body.
fn read_request(stream: &mut std::net::TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    Some(String::from_utf8_lossy(&data).into_owned())
}

fn serve(mut stream: std::net::TcpStream, image_url: &str, opts: ApiServerOptions, handle: &ApiServer) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let mut first = request.lines().next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("");
    if request
        .lines()
        .any(|l| l.to_ascii_lowercase().starts_with("authorization: bearer "))
    {
        handle.authorized_requests.fetch_add(1, Ordering::SeqCst);
    }

    let (status, body) = match (method, path.trim_end_matches('/')) {
        ("POST", p) if p.ends_with("/chat/completions") => {
            handle.chat_requests.fetch_add(1, Ordering::SeqCst);
            if opts.chat_status != 200 {
                (opts.chat_status, error_body(opts.chat_status))
            } else if opts.include_image {
                (
                    200,
                    serde_json::json!({ "choices": [{ "message": {
                        "role": "assistant",
                        "content": "",
                        "images": [{ "type": "image_url", "image_url": { "url": image_url } }]
                    }}]})
                    .to_string(),
                )
            } else {
                (
                    200,
                    serde_json::json!({ "choices": [{ "message": { "content": "no image" } }] })
                        .to_string(),
                )
            }
        }
        ("GET", p) if p.ends_with("/credits") => {
            if opts.credits_status != 200 {
                (opts.credits_status, error_body(opts.credits_status))
            } else {
                (
                    200,
                    serde_json::json!({ "data": {
                        "total_credits": opts.total_credits,
                        "total_usage": opts.total_usage
                    }})
                    .to_string(),
                )
            }
        }
        _ => (404, error_body(404)),
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn error_body(status: u16) -> String {
    serde_json::json!({ "error": { "code": status, "message": reason(status) } }).to_string()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        402 => "Payment Required",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

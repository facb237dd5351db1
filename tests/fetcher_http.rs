//! Fetcher status handling against a minimal local HTTP fixture.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use channelvet::config::Settings;
use channelvet::error::FetchError;
use channelvet::fetch::{Fetcher, RateLimiter};

/// Serve one scripted response per connection; the last entry repeats.
/// Returns the listen address and a hit counter.
async fn serve(responses: Vec<(u16, String)>) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_server = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };

            let index = hits_server
                .fetch_add(1, Ordering::SeqCst)
                .min(responses.len() - 1);
            let (status, ref body) = responses[index];

            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;

            let reason = match status {
                200 => "OK",
                404 => "Not Found",
                429 => "Too Many Requests",
                500 => "Internal Server Error",
                503 => "Service Unavailable",
                _ => "Unknown",
            };
            let extra = if status == 429 { "Retry-After: 0\r\n" } else { "" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\n{extra}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (addr, hits)
}

fn fast_settings() -> Settings {
    Settings {
        // Keep tests quick: near-instant backoff, high rate ceiling.
        retry_base_delay_ms: 1,
        requests_per_minute: 10_000,
        ..Default::default()
    }
}

fn fetcher(settings: &Settings) -> Fetcher {
    let limiter = Arc::new(RateLimiter::per_minute(settings.requests_per_minute));
    Fetcher::new(settings, limiter).unwrap()
}

#[tokio::test]
async fn test_ok_returns_body() {
    let (addr, hits) = serve(vec![(200, "channel page".to_string())]).await;
    let fetcher = fetcher(&fast_settings());

    let body = fetcher.fetch_page(&format!("http://{addr}/")).await.unwrap();
    assert_eq!(body, "channel page");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_404_is_terminal_without_retry() {
    let (addr, hits) = serve(vec![(404, String::new())]).await;
    let fetcher = fetcher(&fast_settings());

    let err = fetcher
        .fetch_page(&format!("http://{addr}/"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NotFound));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_5xx_retries_then_succeeds() {
    let (addr, hits) = serve(vec![
        (500, String::new()),
        (503, String::new()),
        (200, "recovered".to_string()),
    ])
    .await;
    let fetcher = fetcher(&fast_settings());

    let body = fetcher.fetch_page(&format!("http://{addr}/")).await.unwrap();
    assert_eq!(body, "recovered");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_5xx_exhausts_retry_ceiling() {
    let (addr, hits) = serve(vec![(500, String::new())]).await;
    let settings = Settings {
        max_retries: 1,
        ..fast_settings()
    };
    let fetcher = fetcher(&settings);

    let err = fetcher
        .fetch_page(&format!("http://{addr}/"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::Upstream {
            status: 500,
            attempts: 2
        }
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_three_consecutive_429s_abort() {
    let (addr, hits) = serve(vec![(429, String::new())]).await;
    let settings = Settings {
        max_retries: 10,
        max_consecutive_429s: 3,
        ..fast_settings()
    };
    let fetcher = fetcher(&settings);

    let err = fetcher
        .fetch_page(&format!("http://{addr}/"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::RateLimitExhausted { consecutive: 3 }
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_success_resets_consecutive_429_counter() {
    let (addr, _hits) = serve(vec![
        (429, String::new()),
        (429, String::new()),
        (200, "fine".to_string()),
        (429, String::new()),
        (429, String::new()),
        (200, "fine again".to_string()),
    ])
    .await;
    let settings = Settings {
        max_retries: 10,
        max_consecutive_429s: 3,
        ..fast_settings()
    };
    let fetcher = fetcher(&settings);

    // Two 429s, then a 200: the counter resets, so the next pair of
    // 429s does not reach the fatal ceiling either.
    let base = format!("http://{addr}/");
    assert_eq!(fetcher.fetch_page(&base).await.unwrap(), "fine");
    assert_eq!(fetcher.fetch_page(&base).await.unwrap(), "fine again");
}

#[tokio::test]
async fn test_unexpected_status_is_terminal() {
    let (addr, hits) = serve(vec![(403, String::new())]).await;
    let fetcher = fetcher(&fast_settings());

    let err = fetcher
        .fetch_page(&format!("http://{addr}/"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::UnexpectedStatus { status: 403 }
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

//! Redirect navigation
//!
//! Stands in for the browser: shows the provider URL, then waits for the
//! provider to send the user agent back to the redirect URI. A loopback
//! redirect URI is served directly; otherwise, or in addition, the user can
//! paste the final address.

use anyhow::Context;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, Lines};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

const DONE_PAGE: &str = "<!doctype html><html><body><p>Sign-in complete. You can close this window and return to SimpleChat.</p></body></html>";

pub fn is_loopback(url: &Url) -> bool {
    url.scheme() == "http"
        && matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
}

/// Wait for the redirect response. `None` when the user skipped it.
pub async fn capture_redirect<R>(redirect_uri: &Url, lines: &mut Lines<R>) -> anyhow::Result<Option<Url>>
where
    R: AsyncBufRead + Unpin,
{
    let listener = if is_loopback(redirect_uri) {
        let port = redirect_uri.port_or_known_default().unwrap_or(80);
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => Some(listener),
            Err(e) => {
                tracing::warn!(port, error = %e, "Cannot listen for the redirect");
                None
            }
        }
    } else {
        None
    };

    println!("After signing in, paste the address your browser ends up on (or press Enter to skip).");

    match listener {
        Some(listener) => {
            tokio::select! {
                captured = accept_redirect(listener, redirect_uri) => captured.map(Some),
                line = lines.next_line() => Ok(parse_pasted(line?.as_deref(), redirect_uri)),
            }
        }
        None => {
            let line = lines.next_line().await?;
            Ok(parse_pasted(line.as_deref(), redirect_uri))
        }
    }
}

#[derive(Clone)]
struct CaptureState {
    redirect_uri: Url,
    captured: Arc<Mutex<Option<oneshot::Sender<Url>>>>,
}

async fn redirect_handler(
    State(state): State<CaptureState>,
    RawQuery(query): RawQuery,
) -> Html<&'static str> {
    let mut location = state.redirect_uri.clone();
    location.set_query(query.as_deref());

    // Only the first response counts; reloads just see the page again
    if let Some(captured) = state.captured.lock().take() {
        if captured.send(location).is_err() {
            tracing::debug!("Redirect arrived after capture ended");
        }
    }

    Html(DONE_PAGE)
}

/// Serve the redirect URI on `listener` until the provider's response
/// arrives. Other paths get a 404; failed connections are dropped by the
/// server and never end the capture.
pub async fn accept_redirect(listener: TcpListener, redirect_uri: &Url) -> anyhow::Result<Url> {
    let (captured_tx, captured_rx) = oneshot::channel();
    let state = CaptureState {
        redirect_uri: redirect_uri.clone(),
        captured: Arc::new(Mutex::new(Some(captured_tx))),
    };

    let app = Router::new()
        .route(redirect_uri.path(), get(redirect_handler))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state);

    // Dropping the sender also stops the server, e.g. when the address was
    // pasted instead
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
        {
            tracing::warn!(error = %e, "Redirect listener failed");
        }
    });

    let location = captured_rx
        .await
        .context("redirect listener stopped before a response arrived")?;
    shutdown_tx.send(()).ok();

    tracing::debug!("Redirect captured on loopback");
    Ok(location)
}

/// A pasted absolute URL, or a bare `?code=...` query relative to the
/// redirect URI
pub fn parse_pasted(line: Option<&str>, redirect_uri: &Url) -> Option<Url> {
    let text = line?.trim();
    if text.is_empty() {
        return None;
    }
    Url::parse(text).ok().or_else(|| redirect_uri.join(text).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    fn redirect_uri() -> Url {
        Url::parse("http://localhost:8400/").unwrap()
    }

    #[test]
    fn test_loopback_detection() {
        assert!(is_loopback(&redirect_uri()));
        assert!(is_loopback(&Url::parse("http://127.0.0.1:9000/cb").unwrap()));
        assert!(!is_loopback(&Url::parse("https://chat.contoso.com/").unwrap()));
    }

    #[test]
    fn test_parse_pasted() {
        let uri = redirect_uri();

        let full = parse_pasted(Some("http://localhost:8400/?code=abc&state=s"), &uri).unwrap();
        assert_eq!(full.query(), Some("code=abc&state=s"));

        let bare = parse_pasted(Some(" ?code=abc&state=s \n"), &uri).unwrap();
        assert_eq!(bare.as_str(), "http://localhost:8400/?code=abc&state=s");

        assert!(parse_pasted(Some("  "), &uri).is_none());
        assert!(parse_pasted(None, &uri).is_none());
    }

    /// Send one raw request and read the whole response
    async fn exchange(port: u16, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = Vec::new();
        // The server may reset garbage connections; whatever was read counts
        let _ = stream.read_to_end(&mut response).await;
        String::from_utf8_lossy(&response).into_owned()
    }

    async fn loopback() -> (TcpListener, u16, Url) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let uri = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        (listener, port, uri)
    }

    #[tokio::test]
    async fn test_accept_redirect() {
        let (listener, port, uri) = loopback().await;

        let browser = tokio::spawn(async move {
            // A stray favicon request first
            let favicon = exchange(
                port,
                b"GET /favicon.ico HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            )
            .await;
            assert!(favicon.starts_with("HTTP/1.1 404"));

            exchange(
                port,
                b"GET /?code=abc&state=s HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            )
            .await
        });

        let location = accept_redirect(listener, &uri).await.unwrap();
        assert_eq!(location.query(), Some("code=abc&state=s"));
        assert_eq!(location.path(), "/");

        let response = browser.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Sign-in complete"));
    }

    #[tokio::test]
    async fn test_garbage_requests_do_not_end_capture() {
        let (listener, port, uri) = loopback().await;

        let browser = tokio::spawn(async move {
            exchange(port, b"\xff\xfe GET / HTTP/1.1\r\n\r\n").await;

            // Connection dropped without a request
            drop(TcpStream::connect(("127.0.0.1", port)).await.unwrap());

            exchange(
                port,
                b"GET /?code=abc&state=s HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            )
            .await
        });

        let location = accept_redirect(listener, &uri).await.unwrap();
        assert_eq!(location.query(), Some("code=abc&state=s"));
        assert!(browser.await.unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_redirect_on_callback_path() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let uri = Url::parse(&format!("http://127.0.0.1:{port}/auth/callback")).unwrap();

        let browser = tokio::spawn(async move {
            let root = exchange(
                port,
                b"GET /?code=wrong HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            )
            .await;
            assert!(root.starts_with("HTTP/1.1 404"));

            exchange(
                port,
                b"GET /auth/callback?code=abc HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            )
            .await
        });

        let location = accept_redirect(listener, &uri).await.unwrap();
        assert_eq!(location.path(), "/auth/callback");
        assert_eq!(location.query(), Some("code=abc"));
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn test_capture_from_pasted_line() {
        let uri = Url::parse("https://chat.contoso.com/").unwrap();
        let input: &[u8] = b"https://chat.contoso.com/?code=xyz&state=s\n";
        let mut lines = BufReader::new(input).lines();

        let captured = capture_redirect(&uri, &mut lines).await.unwrap().unwrap();
        assert_eq!(captured.query(), Some("code=xyz&state=s"));
    }
}

//! `text/event-stream` over HTTP.
//!
//! Each transport runs one streaming GET on a spawned task, decodes the body
//! with `eventsource-stream`, and reports `Open`, `Message` and `Error`
//! signals. The stream ending, a non-success status or a body error are all
//! reported as a single `Error` signal; the transport does not reconnect.
//!
//! # Example
//!
//! ```ignore
//! use htmx_sse::{HttpConnector, SseExtension, SseOptions};
//!
//! let options = SseOptions::new().with_base_url("http://localhost:3000")?;
//! let connector = HttpConnector::from_options(&options)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::config::{DEFAULT_SWAP_EVENT, SseOptions};
use crate::error::{Error, Result};

use super::{
    Connector, MessageEvent, SignalReceiver, SignalSender, Transport, TransportSignal,
};

// ============================================================================
// Constants
// ============================================================================

/// Media type of an event stream.
const EVENT_STREAM: &str = "text/event-stream";

// ============================================================================
// HttpTransport
// ============================================================================

/// One streaming HTTP request.
struct HttpTransport {
    url: String,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Transport for HttpTransport {
    fn url(&self) -> &str {
        &self.url
    }

    fn close(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!(url = %self.url, "HTTP event stream aborted");
        }
    }
}

// ============================================================================
// HttpConnector
// ============================================================================

/// Opens event streams with a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
    base_url: Option<Url>,
}

impl HttpConnector {
    /// Creates a connector with a default client and no base URL.
    ///
    /// Only absolute subscription URLs can be opened without a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Creates a connector using the options' base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client cannot be built.
    pub fn from_options(options: &SseOptions) -> Result<Self> {
        Ok(Self::new()?.with_base_url_opt(options.base_url.clone()))
    }

    /// Uses a caller-configured client.
    #[inline]
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Sets the base URL for relative subscription URLs.
    #[inline]
    #[must_use]
    pub fn with_base_url(self, base_url: Url) -> Self {
        self.with_base_url_opt(Some(base_url))
    }

    fn with_base_url_opt(mut self, base_url: Option<Url>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Resolves a subscription URL against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the URL is relative and no base is set,
    /// or if it cannot be parsed.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        match &self.base_url {
            Some(base) => Ok(base.join(url)?),
            None => Ok(Url::parse(url)?),
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, url: &str) -> (Box<dyn Transport>, SignalReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = match self.resolve(url) {
            Ok(resolved) => {
                debug!(url, %resolved, "Opening HTTP event stream");
                Some(tokio::spawn(run_stream(self.client.clone(), resolved, tx)))
            }
            Err(e) => {
                warn!(url, error = %e, "Cannot resolve subscription URL");
                let _ = tx.send(TransportSignal::error(e.to_string()));
                None
            }
        };

        let transport = HttpTransport {
            url: url.to_string(),
            task: Mutex::new(task),
        };
        (Box::new(transport), rx)
    }
}

// ============================================================================
// Stream Task
// ============================================================================

/// Reads one event stream until it ends, fails, or the receiver goes away.
async fn run_stream(client: Client, url: Url, tx: SignalSender) {
    let result = read_stream(&client, &url, &tx).await;

    let message = match result {
        Ok(()) => "event stream ended".to_string(),
        Err(e) => e.to_string(),
    };
    debug!(%url, reason = %message, "HTTP event stream finished");
    let _ = tx.send(TransportSignal::error(message));
}

async fn read_stream(client: &Client, url: &Url, tx: &SignalSender) -> Result<()> {
    let response = client
        .get(url.clone())
        .header(ACCEPT, EVENT_STREAM)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::connection(format!("unexpected status {status}")));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with(EVENT_STREAM) {
        return Err(Error::connection(format!(
            "unexpected content type {content_type:?}"
        )));
    }

    if tx.send(TransportSignal::Open).is_err() {
        return Ok(());
    }

    let mut events = response.bytes_stream().eventsource();

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| Error::connection(e.to_string()))?;
        let message = MessageEvent {
            event: if event.event.is_empty() {
                DEFAULT_SWAP_EVENT.to_string()
            } else {
                event.event
            },
            data: event.data,
            last_event_id: (!event.id.is_empty()).then_some(event.id),
        };
        if tx.send(TransportSignal::Message(message)).is_err() {
            return Ok(());
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response on a random local port.
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn test_resolve_relative() {
        let connector = HttpConnector::new()
            .unwrap()
            .with_base_url(Url::parse("http://localhost:3000/app/").unwrap());
        let url = connector.resolve("/events").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/events");
    }

    #[test]
    fn test_resolve_without_base() {
        let connector = HttpConnector::new().unwrap();
        assert!(connector.resolve("/events").is_err());
        assert!(connector.resolve("http://example.com/events").is_ok());
    }

    #[tokio::test]
    async fn test_unresolvable_url_reports_error() {
        let connector = HttpConnector::new().unwrap();
        let (transport, mut rx) = connector.connect("/events");
        assert_eq!(transport.url(), "/events");
        assert!(matches!(rx.recv().await, Some(TransportSignal::Error { .. })));
        transport.close();
    }

    #[tokio::test]
    async fn test_stream_open_messages_then_error() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/event-stream\r\n\
             Connection: close\r\n\r\n\
             event: chat\ndata: <div>Chat message</div>\n\n\
             data: ping\n\n",
        )
        .await;

        let connector = HttpConnector::new().unwrap().with_base_url(base);
        let (_transport, mut rx) = connector.connect("/events");

        assert_eq!(rx.recv().await, Some(TransportSignal::Open));
        assert_eq!(
            rx.recv().await,
            Some(TransportSignal::Message(MessageEvent::new(
                "chat",
                "<div>Chat message</div>"
            )))
        );
        assert!(matches!(
            rx.recv().await,
            Some(TransportSignal::Message(ref m)) if m.event == "message" && m.data == "ping"
        ));
        assert!(matches!(rx.recv().await, Some(TransportSignal::Error { .. })));
    }

    #[tokio::test]
    async fn test_stream_crlf_ids_and_multiline_data() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/event-stream; charset=utf-8\r\n\
             Connection: close\r\n\r\n\
             id: 7\r\nevent: news\r\ndata: first\r\ndata: second\r\n\r\n",
        )
        .await;

        let connector = HttpConnector::new().unwrap().with_base_url(base);
        let (_transport, mut rx) = connector.connect("/events");

        assert_eq!(rx.recv().await, Some(TransportSignal::Open));
        assert_eq!(
            rx.recv().await,
            Some(TransportSignal::Message(MessageEvent {
                event: "news".to_string(),
                data: "first\nsecond".to_string(),
                last_event_id: Some("7".to_string()),
            }))
        );
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let base = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let connector = HttpConnector::new().unwrap().with_base_url(base);
        let (_transport, mut rx) = connector.connect("/missing");

        match rx.recv().await {
            Some(TransportSignal::Error { message }) => assert!(message.contains("404")),
            other => panic!("expected error signal, got {other:?}"),
        }
    }
}

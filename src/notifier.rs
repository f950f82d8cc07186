//! A client for sending notifications to an ntfy endpoint.

use async_trait::async_trait;
use std::time::Duration;
use tracing::error;

/// One outbound push notification, built per dispatch and not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// The ntfy topic on the remote endpoint.
    pub destination: String,
    /// The notification text, sent verbatim as the request body.
    pub body: String,
    /// Optional display title.
    pub title: Option<String>,
    /// Optional ntfy priority.
    pub priority: Option<u8>,
    /// Comma-joined tags; empty when the mapping has none.
    pub tags: String,
}

/// A trait for clients that can deliver notifications. Keeps the router
/// testable without a real HTTP endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a single notification.
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// A client for POSTing notifications to an ntfy-compatible server.
pub struct NtfyClient {
    base_url: String,
    client: reqwest::Client,
}

impl NtfyClient {
    /// Default bound on the outbound request, so a stalled endpoint cannot
    /// stall the broker delivery loop indefinitely.
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new `NtfyClient` with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    /// Creates a new `NtfyClient` with an explicit request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for NtfyClient {
    /// Sends the notification as an HTTP POST to `<base_url>/<destination>`,
    /// with the metadata carried in the `Title`, `Priority` and `Tags`
    /// headers. A non-2xx response is reported as an error.
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.base_url, notification.destination);

        let mut request = self.client.post(&url).body(notification.body.clone());
        if let Some(title) = &notification.title {
            request = request.header("Title", title.as_str());
        }
        if let Some(priority) = notification.priority {
            request = request.header("Priority", priority.to_string());
        }
        request = request.header("Tags", notification.tags.as_str());

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                body = %body,
                "ntfy endpoint rejected notification"
            );
            anyhow::bail!("ntfy endpoint returned status {}", status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod ntfy_client_tests {
    use super::*;
    use wiremock::matchers::{body_string, header, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification() -> Notification {
        Notification {
            destination: "t1".to_string(),
            body: "hello".to_string(),
            title: Some("T".to_string()),
            priority: Some(3),
            tags: "a,b".to_string(),
        }
    }

    #[tokio::test]
    async fn posts_body_and_metadata_headers() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/t1"))
            .and(body_string("hello"))
            .and(header("Title", "T"))
            .and(header("Priority", "3"))
            .and(headers("Tags", vec!["a", "b"]))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = NtfyClient::new(server.uri()).unwrap();

        // Act
        let result = client.send(&notification()).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn omits_title_and_priority_when_unset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/t1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = NtfyClient::new(server.uri()).unwrap();
        let result = client
            .send(&Notification {
                title: None,
                priority: None,
                tags: String::new(),
                ..notification()
            })
            .await;
        assert!(result.is_ok());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("Title"));
        assert!(!requests[0].headers.contains_key("Priority"));
    }

    #[tokio::test]
    async fn reports_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/t1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = NtfyClient::new(server.uri()).unwrap();
        let result = client.send(&notification()).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("500"));
    }

    #[tokio::test]
    async fn times_out_on_a_stalled_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/t1"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client =
            NtfyClient::with_timeout(server.uri(), Duration::from_millis(100)).unwrap();
        let result = client.send(&notification()).await;

        assert!(result.is_err());
        let err = result.unwrap_err();
        let is_timeout = err.chain().any(|cause| {
            cause
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout)
        });
        assert!(is_timeout, "expected a timeout error, got: {}", err);
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let client = NtfyClient::new("https://ntfy.example/").unwrap();
        assert_eq!(client.base_url, "https://ntfy.example");
    }
}

//! Marketplace REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::entities::{ApplicationId, OrderId, RequestId, SharedCredentials, ThreadId};
use crate::domain::errors::TransportError;
use crate::domain::ports::MarketplacePort;
use crate::domain::wire::{
    AcceptApplication, AcceptedRequest, ApiErrorBody, ChatMessage, MessagePage, OrderResource,
    OutgoingMessage, ThreadPage,
};

const USER_AGENT: &str = concat!("marketchat/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bearer-authenticated client for the marketplace API.
///
/// The token is read from [`SharedCredentials`] on every request, so a login
/// or logout elsewhere takes effect on the next call.
pub struct MarketplaceClient {
    client: Client,
    base_url: Url,
    credentials: SharedCredentials,
}

impl MarketplaceClient {
    /// # Errors
    /// Returns [`TransportError::InvalidRequest`] for an unusable base URL or
    /// if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        timeout: Option<Duration>,
        credentials: SharedCredentials,
    ) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::invalid_request(format!("invalid base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::invalid_request(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| {
                TransportError::invalid_request(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, TransportError> {
        let token = self
            .credentials
            .current()
            .ok_or(TransportError::NoCredentials)?;

        Ok(self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, token.bearer_header())
            .header(header::ACCEPT, "application/json"))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, TransportError> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Marketplace request failed without a response");
            network_error(&e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| network_error(&e))?;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            let error = decode_error(status, &body);
            debug!(status = status.as_u16(), error = %error, "Marketplace request rejected");
            Err(error)
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, TransportError> {
        let body = self.execute(self.authorized(Method::GET, url)?).await?;
        decode_body(&body)
    }

    async fn post<B, T>(&self, url: Url, payload: Option<&B>) -> Result<T, TransportError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut request = self.authorized(Method::POST, url)?;
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        let body = self.execute(request).await?;
        decode_body(&body)
    }
}

/// Joins `segments` onto `base`, percent-encoding each one.
///
/// # Errors
/// Returns [`TransportError::InvalidRequest`] when `base` cannot carry a path.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, TransportError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| TransportError::invalid_request(format!("unusable base url: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Maps a non-2xx response into [`TransportError::Http`], keeping the
/// structured error body when the server sent one.
#[must_use]
pub fn decode_error(status: StatusCode, body: &[u8]) -> TransportError {
    let parsed = serde_json::from_slice::<ApiErrorBody>(body).unwrap_or_default();

    TransportError::Http {
        status: status.as_u16(),
        error_id: parsed.error_id,
        kind: parsed.kind,
        message: parsed.message.filter(|m| !m.trim().is_empty()),
        details: parsed.details,
    }
}

/// Decodes a success body. An empty body decodes as JSON `null`, which lets
/// `()` stand in for endpoints that return nothing.
///
/// # Errors
/// Returns [`TransportError::Decode`] when the body does not match `T`.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| TransportError::decode(e.to_string()))
}

fn network_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::network("request timed out")
    } else if error.is_connect() {
        TransportError::network("failed to connect to server")
    } else if error.is_decode() {
        TransportError::decode(error.to_string())
    } else {
        TransportError::network(error.to_string())
    }
}

#[async_trait]
impl MarketplacePort for MarketplaceClient {
    async fn fetch_threads(&self) -> Result<ThreadPage, TransportError> {
        debug!("Fetching threads");
        let url = endpoint(&self.base_url, &["threads"])?;
        self.get(url).await
    }

    async fn fetch_messages(
        &self,
        thread_id: &ThreadId,
        cursor: Option<String>,
    ) -> Result<MessagePage, TransportError> {
        debug!(thread_id = %thread_id, cursor = ?cursor, "Fetching messages");
        let mut url = endpoint(&self.base_url, &["threads", thread_id.as_str(), "messages"])?;
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("cursor", &cursor);
        }
        self.get(url).await
    }

    async fn send_message(
        &self,
        thread_id: &ThreadId,
        message: OutgoingMessage,
    ) -> Result<ChatMessage, TransportError> {
        debug!(thread_id = %thread_id, "Sending message");
        let url = endpoint(&self.base_url, &["threads", thread_id.as_str(), "messages"])?;
        self.post(url, Some(&message)).await
    }

    async fn mark_thread_read(&self, thread_id: &ThreadId) -> Result<(), TransportError> {
        debug!(thread_id = %thread_id, "Marking thread read");
        let url = endpoint(&self.base_url, &["threads", thread_id.as_str(), "read"])?;
        let _: serde_json::Value = self.post::<(), _>(url, None).await?;
        Ok(())
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderResource, TransportError> {
        debug!(order_id = %order_id, "Fetching order");
        let url = endpoint(&self.base_url, &["orders", order_id.as_str()])?;
        self.get(url).await
    }

    async fn accept_request(
        &self,
        request_id: &RequestId,
        application_id: &ApplicationId,
    ) -> Result<AcceptedRequest, TransportError> {
        debug!(request_id = %request_id, application_id = %application_id, "Accepting application");
        let url = endpoint(&self.base_url, &["requests", request_id.as_str(), "accept"])?;
        let body = AcceptApplication {
            application_id: application_id.to_string(),
        };
        self.post(url, Some(&body)).await
    }
}

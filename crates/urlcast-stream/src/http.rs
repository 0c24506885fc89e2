//! Streaming REST client
//!
//! Every request is signed with the configured [`KeyProvider`]. The client
//! is built once per process; connections are pooled by `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use urlcast_auth::{KeyProvider, RequestSigner};
use urlcast_core::config::StreamConfig;
use urlcast_core::STREAMING_API_VERSION;

use crate::client::StreamClient;
use crate::error::{StreamError, StreamResult};
use crate::model::{
    CreateGroupCursorDetails, Cursor, GetMessagesResponse, PutMessagesDetails, PutMessagesResult,
    ServiceErrorBody, StreamMessage,
};

const NEXT_CURSOR_HEADER: &str = "opc-next-cursor";

/// Signed HTTP client for one stream pool endpoint
pub struct HttpStreamClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
    signer: RequestSigner,
}

impl HttpStreamClient {
    pub fn new(config: &StreamConfig, provider: Arc<dyn KeyProvider>) -> StreamResult<Self> {
        Self::with_timeouts(
            &config.endpoint,
            config.timeout(),
            config.connect_timeout(),
            provider,
        )
    }

    pub fn with_timeouts(
        endpoint: &str,
        timeout: Duration,
        connect_timeout: Duration,
        provider: Arc<dyn KeyProvider>,
    ) -> StreamResult<Self> {
        Url::parse(endpoint)
            .map_err(|e| StreamError::InvalidConfig(format!("endpoint {}: {}", endpoint, e)))?;

        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
            signer: RequestSigner::new(provider),
        })
    }

    fn stream_url(&self, stream_id: &str, suffix: &str) -> StreamResult<Url> {
        let url = format!(
            "{}/{}/streams/{}/{}",
            self.endpoint, STREAMING_API_VERSION, stream_id, suffix
        );
        Url::parse(&url).map_err(|e| StreamError::InvalidConfig(format!("{}: {}", url, e)))
    }

    async fn send<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> StreamResult<(T, HeaderMap)>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| StreamError::Decode(format!("serialize request: {}", e)))?;

        let signed = self.signer.sign(method.as_str(), &url, body.as_deref())?;

        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url.clone())
            .header("accept", "application/json");

        for (name, value) in &signed.headers {
            // reqwest derives these from the URL and body
            if matches!(*name, "host" | "content-length") {
                continue;
            }
            request = request.header(*name, value.as_str());
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StreamError::from_reqwest(e, self.timeout))?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ServiceErrorBody>(&text) {
                Ok(body) => (body.code, body.message),
                Err(_) => (status.as_str().to_string(), text),
            };
            return Err(StreamError::Service {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StreamError::from_reqwest(e, self.timeout))?;
        let parsed = serde_json::from_slice(&bytes)
            .map_err(|e| StreamError::Decode(format!("{} response: {}", url.path(), e)))?;

        Ok((parsed, headers))
    }
}

#[async_trait]
impl StreamClient for HttpStreamClient {
    async fn put_messages(
        &self,
        stream_id: &str,
        details: &PutMessagesDetails,
    ) -> StreamResult<PutMessagesResult> {
        let url = self.stream_url(stream_id, "messages")?;
        let (result, _) = self.send(Method::POST, url, Some(details)).await?;
        Ok(result)
    }

    async fn create_group_cursor(
        &self,
        stream_id: &str,
        details: &CreateGroupCursorDetails,
    ) -> StreamResult<Cursor> {
        let url = self.stream_url(stream_id, "groupCursors")?;
        let (cursor, _) = self.send(Method::POST, url, Some(details)).await?;
        Ok(cursor)
    }

    async fn get_messages(
        &self,
        stream_id: &str,
        cursor: &str,
        limit: Option<u32>,
    ) -> StreamResult<GetMessagesResponse> {
        let mut url = self.stream_url(stream_id, "messages")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("cursor", cursor);
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }

        let (messages, headers): (Vec<StreamMessage>, _) =
            self.send::<(), _>(Method::GET, url, None).await?;

        let next_cursor = headers
            .get(NEXT_CURSOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(GetMessagesResponse {
            messages,
            next_cursor,
        })
    }
}

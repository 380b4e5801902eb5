//! HTTP API Client
//!
//! reqwest-based implementation of [`StateApi`] and [`EventSource`].

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

use super::sse::SseDecoder;
use super::{EventSource, MessageStream, ServerResponse, StateApi};
use crate::config::ServerConfig;
use crate::error::{PadronError, PadronResult};
use crate::model::{FamilyCreateRequest, PersonCreateRequest, StateSnapshot};
use crate::view::CacheBust;

/// HTTP client for the population server
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    /// Applied to request/response calls only, never to the push stream
    request_timeout: Option<Duration>,
}

impl HttpApi {
    /// Create a client for the configured server
    pub fn new(config: &ServerConfig) -> PadronResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PadronError::Network(format!("failed to create HTTP client: {}", e)))?;

        let request_timeout = match config.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL of the tree image, without the cache-bust parameter
    pub fn tree_endpoint(&self) -> String {
        self.url("/tree.svg")
    }

    fn with_timeout(&self, request: RequestBuilder) -> RequestBuilder {
        match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    /// Download the tree image for a cache-bust token
    pub async fn fetch_tree(&self, token: &CacheBust) -> PadronResult<String> {
        let response = self
            .with_timeout(self.client.get(self.tree_endpoint()))
            .query(&[("ts", token.to_string())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PadronError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> PadronResult<ServerResponse> {
        let response = self
            .with_timeout(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        tracing::debug!(path, status, "Mutation answered");

        Ok(ServerResponse::from_text(status, text))
    }
}

#[async_trait]
impl StateApi for HttpApi {
    async fn fetch_state(&self) -> PadronResult<StateSnapshot> {
        let response = self
            .with_timeout(self.client.get(self.url("/state")))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PadronError::Status {
                status: status.as_u16(),
                body,
            });
        }

        StateSnapshot::parse(&body)
    }

    async fn create_family(&self, request: &FamilyCreateRequest) -> PadronResult<ServerResponse> {
        self.post_json("/families", request).await
    }

    async fn create_person(&self, request: &PersonCreateRequest) -> PadronResult<ServerResponse> {
        self.post_json("/people", request).await
    }
}

#[async_trait]
impl EventSource for HttpApi {
    async fn connect(&self) -> PadronResult<MessageStream> {
        let response = self
            .client
            .get(self.url("/stream"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PadronError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = Box::pin(response.bytes_stream());
        let messages = futures_util::stream::unfold(
            (bytes, SseDecoder::new(), VecDeque::new()),
            |(mut bytes, mut decoder, mut pending)| async move {
                loop {
                    if let Some(data) = pending.pop_front() {
                        return Some((Ok(data), (bytes, decoder, pending)));
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => pending.extend(
                            decoder
                                .feed(&chunk)
                                .into_iter()
                                .filter(|event| event.is_message())
                                .map(|event| event.data),
                        ),
                        Some(Err(e)) => {
                            return Some((Err(PadronError::from(e)), (bytes, decoder, pending)))
                        }
                        None => return None,
                    }
                }
            },
        );

        Ok(messages.boxed())
    }
}

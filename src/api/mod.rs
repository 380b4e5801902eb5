//! Population Server API
//!
//! Transport seams between the live view and the remote server.
//!
//! ## Endpoints
//!
//! - `GET /state`: full snapshot, including people
//! - `GET /stream`: server-push event stream of state fragments
//! - `GET /tree.svg?ts=<token>`: family tree image
//! - `POST /families`, `POST /people`: create-requests, response echoed verbatim
//!
//! [`StateApi`] and [`EventSource`] are the seams the live view depends on;
//! [`HttpApi`] implements both over HTTP.

mod client;
mod sse;

pub use client::HttpApi;
pub use sse::{SseDecoder, SseEvent};

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::PadronResult;
use crate::model::{FamilyCreateRequest, PersonCreateRequest, StateSnapshot};

/// Stream of raw push message payloads for one subscription
///
/// An `Err` item means the transport dropped; the subscription is over.
pub type MessageStream = BoxStream<'static, PadronResult<String>>;

/// Request/response side of the server
#[async_trait]
pub trait StateApi: Send + Sync {
    /// Pull a full snapshot
    async fn fetch_state(&self) -> PadronResult<StateSnapshot>;

    /// Submit a new family
    async fn create_family(&self, request: &FamilyCreateRequest) -> PadronResult<ServerResponse>;

    /// Submit a new person
    async fn create_person(&self, request: &PersonCreateRequest) -> PadronResult<ServerResponse>;
}

/// Server-push side of the server
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open one subscription
    async fn connect(&self) -> PadronResult<MessageStream>;
}

/// Whatever the server answered to a mutation, kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct ServerResponse {
    pub status: u16,
    pub body: ResponseBody,
}

/// Response body, structured when it parses as JSON
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ServerResponse {
    /// Build from a status and raw body text
    pub fn from_text(status: u16, text: String) -> Self {
        let body = match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        };
        Self { status, body }
    }

    /// Build a JSON response
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(value),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Text for the debug output area: pretty JSON, or the raw body
    pub fn render(&self) -> String {
        match &self.body {
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Text(text) => text.clone(),
        }
    }
}

//! Remote operation gateway.
//!
//! Four independent remote operations carried over a single GraphQL endpoint.
//! Every fault is captured here and converted to a [`GatewayError`]; nothing
//! panics or throws past this boundary. The gateway never touches workflow
//! state; it only performs the network exchange.

mod graphql;
pub mod types;


pub use graphql::GraphqlGateway;
pub use types::{
    AspectRatio, GeneratedImage, ImageStyle, PublishOutcome, PublishTicket, Reply,
};

use async_trait::async_trait;
use thiserror::Error;

/// Raw transform payload as the service returns it; the driver pairs it with
/// the original text to build a [`types::Transformed`].
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct TransformOutput {
    #[serde(rename = "rewrittenText")]
    pub rewritten_text: String,
    pub explanation: Option<String>,
}

/// A successful delivery. GraphQL allows partial responses (data alongside
/// errors); when that happens the data is still delivered and the first
/// error message rides along as `notice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered<T> {
    pub payload: T,
    pub notice: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("service error: {0}")]
    Service(String),
}

/// The four remote operations. Implementations must be panic-free: any
/// transport, status, or decode problem comes back as a [`GatewayError`].
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn transform_text(
        &self,
        original_text: &str,
        level: u8,
    ) -> Result<Delivered<TransformOutput>, GatewayError>;

    async fn generate_replies(&self, text: &str) -> Result<Delivered<Vec<Reply>>, GatewayError>;

    async fn generate_image(
        &self,
        text: &str,
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    ) -> Result<Delivered<GeneratedImage>, GatewayError>;

    async fn publish_post(
        &self,
        ticket: &PublishTicket,
    ) -> Result<Delivered<PublishOutcome>, GatewayError>;
}

//! GraphQL transport for the gateway.
//!
//! Each operation POSTs a `{query, variables}` envelope to the configured
//! endpoint. Response policy: partial responses (data + errors) are delivered
//! with the first error surfaced as a notice; errors with no data become
//! [`GatewayError::Service`].

use super::types::{
    AspectRatio, GeneratedImage, ImageStyle, PublishOutcome, PublishTicket, Reply,
};
use super::{Delivered, Gateway, GatewayError, TransformOutput};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const TRANSFORM_TEXT: &str = "\
mutation TransformText($input: TransformInput!) {
  transformText(input: $input) {
    rewrittenText
    explanation
  }
}";

const GENERATE_REPLIES: &str = "\
mutation GenerateReplies($text: String!) {
  generateReplies(text: $text) {
    id
    category
    content
  }
}";

const GENERATE_IMAGE: &str = "\
mutation GenerateImage($input: GenerateImageInput!) {
  generateImage(input: $input) {
    url
    prompt
    generatedAt
  }
}";

const PUBLISH_POST: &str = "\
mutation PublishPost($input: PublishInput!) {
  publishPost(input: $input) {
    success
    remoteId
    remoteUrl
    errorReason
  }
}";

/// Cap on how much of an error body gets echoed into messages.
const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Serialize)]
struct Envelope<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct Response<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<WireError>,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

#[derive(Deserialize)]
struct TransformData {
    #[serde(rename = "transformText")]
    transform_text: TransformOutput,
}

#[derive(Deserialize)]
struct RepliesData {
    #[serde(rename = "generateReplies")]
    generate_replies: Vec<Reply>,
}

#[derive(Deserialize)]
struct ImageData {
    #[serde(rename = "generateImage")]
    generate_image: GeneratedImage,
}

#[derive(Deserialize)]
struct PublishData {
    #[serde(rename = "publishPost")]
    publish_post: PublishOutcome,
}

pub struct GraphqlGateway {
    client: Client,
    endpoint: String,
}

impl GraphqlGateway {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    async fn post<D: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<Delivered<D>, GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&Envelope { query, variables })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status,
                body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        let parsed: Response<D> = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        match (parsed.data, parsed.errors) {
            (Some(data), errors) => Ok(Delivered {
                payload: data,
                notice: errors.into_iter().next().map(|e| e.message),
            }),
            (None, errors) if !errors.is_empty() => Err(GatewayError::Service(
                errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
            (None, _) => Err(GatewayError::Malformed(
                "response carried neither data nor errors".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Gateway for GraphqlGateway {
    async fn transform_text(
        &self,
        original_text: &str,
        level: u8,
    ) -> Result<Delivered<TransformOutput>, GatewayError> {
        let variables = json!({
            "input": { "originalText": original_text, "level": level }
        });
        let delivered: Delivered<TransformData> = self.post(TRANSFORM_TEXT, variables).await?;
        Ok(Delivered {
            payload: delivered.payload.transform_text,
            notice: delivered.notice,
        })
    }

    async fn generate_replies(&self, text: &str) -> Result<Delivered<Vec<Reply>>, GatewayError> {
        let variables = json!({ "text": text });
        let delivered: Delivered<RepliesData> = self.post(GENERATE_REPLIES, variables).await?;
        Ok(Delivered {
            payload: delivered.payload.generate_replies,
            notice: delivered.notice,
        })
    }

    async fn generate_image(
        &self,
        text: &str,
        style: ImageStyle,
        aspect_ratio: AspectRatio,
    ) -> Result<Delivered<GeneratedImage>, GatewayError> {
        let variables = json!({
            "input": { "text": text, "style": style, "aspectRatio": aspect_ratio }
        });
        let delivered: Delivered<ImageData> = self.post(GENERATE_IMAGE, variables).await?;
        Ok(Delivered {
            payload: delivered.payload.generate_image,
            notice: delivered.notice,
        })
    }

    async fn publish_post(
        &self,
        ticket: &PublishTicket,
    ) -> Result<Delivered<PublishOutcome>, GatewayError> {
        let variables = json!({
            "input": {
                "text": ticket.text,
                "imageUrl": ticket.image_url,
                "addHashtag": ticket.add_hashtag,
                "addDisclaimer": ticket.add_disclaimer,
            }
        });
        let delivered: Delivered<PublishData> = self.post(PUBLISH_POST, variables).await?;
        Ok(Delivered {
            payload: delivered.payload.publish_post,
            notice: delivered.notice,
        })
    }
}

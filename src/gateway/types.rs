//! Domain types shared between the gateway wire contract and workflow state.
//!
//! Field renames follow the GraphQL schema (camelCase fields, SCREAMING_SNAKE
//! enum values), so these types deserialize directly from mutation payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a successful text transformation, paired with the input it was
/// generated from so stale results can never be shown against edited text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transformed {
    pub original_text: String,
    pub rewritten_text: String,
    pub explanation: Option<String>,
}

/// One simulated stranger reply to the rewritten post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reply {
    pub id: String,
    pub category: ReplyCategory,
    pub content: String,
}

/// Closed set of reply flavors the service simulates. The service may return
/// any count or subset; all four present is not guaranteed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyCategory {
    LogicalCriticism,
    Nitpicking,
    OffTarget,
    ExcessiveDefense,
}

impl ReplyCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ReplyCategory::LogicalCriticism => "Logical criticism",
            ReplyCategory::Nitpicking => "Nitpicking",
            ReplyCategory::OffTarget => "Off target",
            ReplyCategory::ExcessiveDefense => "Excessive defense",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageStyle {
    Realistic,
    Illustration,
    /// Default in the web UI; kept as the default here too.
    #[default]
    Meme,
    Dramatic,
}

impl ImageStyle {
    pub fn label(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "Realistic",
            ImageStyle::Illustration => "Illustration",
            ImageStyle::Meme => "Meme",
            ImageStyle::Dramatic => "Dramatic",
        }
    }

    /// Cycle through styles in UI order.
    pub fn next(&self) -> Self {
        match self {
            ImageStyle::Meme => ImageStyle::Realistic,
            ImageStyle::Realistic => ImageStyle::Illustration,
            ImageStyle::Illustration => ImageStyle::Dramatic,
            ImageStyle::Dramatic => ImageStyle::Meme,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
}

/// A rendered illustration for the rewritten post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
    pub prompt: String,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}

/// Outcome of a publish attempt. `success=false` is a domain-level failure
/// distinct from transport faults, but the user sees both the same way:
/// the post did not happen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishOutcome {
    pub success: bool,
    #[serde(rename = "remoteId")]
    pub remote_id: Option<String>,
    #[serde(rename = "remoteUrl")]
    pub remote_url: Option<String>,
    #[serde(rename = "errorReason")]
    pub error_reason: Option<String>,
}

/// The exact payload frozen at confirmation time. Publishing always sends
/// this snapshot, never the live workflow state, so edits made mid-confirm
/// cannot leak into the outgoing post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishTicket {
    pub text: String,
    pub image_url: Option<String>,
    pub add_hashtag: bool,
    pub add_disclaimer: bool,
}

//! Capability providers: the paid external APIs the broker is the sole
//! caller of (spec §4.K). The broker validates and rate-limits; these
//! traits are the seam for whatever concrete image/speech/transcription
//! backend is wired in at startup.

use async_trait::async_trait;

/// Generates an image from a text prompt.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate an image, returning bytes and a content-type.
    async fn generate(&self, prompt: &str) -> Result<(Vec<u8>, String), ProviderError>;
}

/// Synthesizes speech audio from text.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize speech, returning audio bytes and a content-type.
    async fn speak(&self, text: &str) -> Result<(Vec<u8>, String), ProviderError>;
}

/// Transcribes audio to text.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe `audio` (already-read bytes, `content_type` as
    /// reported by the request).
    async fn transcribe(&self, audio: &[u8], content_type: &str) -> Result<String, ProviderError>;
}

/// Summarizes the content behind a URL.
#[async_trait]
pub trait UrlSummarizer: Send + Sync {
    /// Fetch and summarize `url`'s content.
    async fn summarize(&self, url: &str) -> Result<String, ProviderError>;
}

/// A capability provider call failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The upstream provider returned an error or was unreachable.
    #[error("provider error: {0}")]
    Upstream(String),
}

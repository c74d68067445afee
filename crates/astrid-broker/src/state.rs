//! Shared state handed to every broker route (spec §4.K).

use std::sync::Arc;

use astrid_auth::InternalAuth;
use astrid_ratelimit::RateLimiter;
use astrid_storage::Database;
use tokio::sync::Semaphore;

use crate::config::BrokerConfig;
use crate::providers::{ImageProvider, TranscriptionProvider, TtsProvider, UrlSummarizer};

/// Everything a route handler needs: config, the auth verifier, the rate
/// limiter, the global concurrency gate, and the capability providers.
#[derive(Clone)]
pub struct AppState {
    /// Broker tunables.
    pub config: Arc<BrokerConfig>,
    /// Verifies internal-auth headers on every request.
    pub auth: Arc<InternalAuth>,
    /// Per-user rate limiter.
    pub limiter: Arc<RateLimiter>,
    /// `memory_entry` table access for the memory endpoints.
    pub db: Database,
    /// Caps global in-flight request count.
    pub concurrency: Arc<Semaphore>,
    /// Image-generation backend.
    pub image: Option<Arc<dyn ImageProvider>>,
    /// Text-to-speech backend.
    pub tts: Option<Arc<dyn TtsProvider>>,
    /// Audio-transcription backend.
    pub transcription: Option<Arc<dyn TranscriptionProvider>>,
    /// URL-summarization backend.
    pub summarizer: Option<Arc<dyn UrlSummarizer>>,
}

impl AppState {
    /// Build broker state from `config`, with no capability providers
    /// wired in yet (routes needing them return 501 until set).
    #[must_use]
    pub fn new(config: BrokerConfig, auth: InternalAuth, limiter: RateLimiter, db: Database) -> Self {
        let concurrency = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
            db,
            concurrency,
            image: None,
            tts: None,
            transcription: None,
            summarizer: None,
        }
    }

    /// Attach an image-generation backend.
    #[must_use]
    pub fn with_image(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.image = Some(provider);
        self
    }

    /// Attach a text-to-speech backend.
    #[must_use]
    pub fn with_tts(mut self, provider: Arc<dyn TtsProvider>) -> Self {
        self.tts = Some(provider);
        self
    }

    /// Attach an audio-transcription backend.
    #[must_use]
    pub fn with_transcription(mut self, provider: Arc<dyn TranscriptionProvider>) -> Self {
        self.transcription = Some(provider);
        self
    }

    /// Attach a URL-summarization backend.
    #[must_use]
    pub fn with_summarizer(mut self, provider: Arc<dyn UrlSummarizer>) -> Self {
        self.summarizer = Some(provider);
        self
    }
}

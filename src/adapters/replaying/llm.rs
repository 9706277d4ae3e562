//! Replaying adapter for the `LlmClient` port.

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::replay_result;
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmFuture};

/// Serves recorded LLM completions from a cassette, ignoring the request.
pub struct ReplayingLlmClient {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingLlmClient {
    /// Create a replaying LLM client backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }

    /// Create a replaying LLM client over an in-memory cassette.
    #[must_use]
    pub fn from_cassette(cassette: &Cassette) -> Self {
        Self::new(Arc::new(Mutex::new(CassetteReplayer::new(cassette))))
    }

    /// Load a cassette file and replay it.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        Ok(Self::from_cassette(&Cassette::load(path)?))
    }
}

impl LlmClient for ReplayingLlmClient {
    fn complete(&self, _request: &CompletionRequest) -> LlmFuture<'_> {
        let output = self
            .replayer
            .lock()
            .map(|mut replayer| replayer.next_interaction("llm", "complete").output)
            .map_err(|_| "cassette replayer lock poisoned".to_string());

        Box::pin(async move {
            let output = output?;
            replay_result::<CompletionResponse>(output, "llm::complete")
        })
    }
}

//! Speech generation backend abstraction.
//!
//! The `SpeechSynthesizer` trait decouples the studio from any specific
//! generation service (offline stub, Gemini TTS, a future local model).
//!
//! `&mut self` on `synthesize` intentionally expresses that backends are
//! stateful — connection pools, per-session counters. All mutation is
//! serialised through `SynthesizerHandle`'s `parking_lot::Mutex`.

pub mod stub;

#[cfg(feature = "remote-api")]
pub mod gemini;

#[cfg(feature = "remote-api")]
pub use gemini::{GeminiConfig, GeminiSynthesizer};

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::audio::decode::EncodedPayload;
use crate::error::Result;

/// One request at the generation-service boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    /// Fully constructed prompt (script plus voice direction).
    pub prompt: String,
    /// Prebuilt voice the service should render with.
    pub voice_name: String,
}

/// Contract for speech generation backends.
pub trait SpeechSynthesizer: Send + 'static {
    /// One round trip: prompt in, transport payload out.
    ///
    /// Decoding the payload is the caller's job — backends never see
    /// `SampleBuffer`s.
    ///
    /// # Errors
    /// - `VocalisError::Transport` for connection failures and empty
    ///   responses.
    /// - `VocalisError::SafetyRejected` when the service refused the prompt;
    ///   hosts must surface this distinctly, not as a generic failure.
    fn synthesize(&mut self, request: &SynthesisRequest) -> Result<EncodedPayload>;
}

/// Thread-safe reference-counted handle to any `SpeechSynthesizer`.
#[derive(Clone)]
pub struct SynthesizerHandle(pub Arc<Mutex<dyn SpeechSynthesizer>>);

impl SynthesizerHandle {
    /// Wrap any `SpeechSynthesizer` in a `SynthesizerHandle`.
    pub fn new<S: SpeechSynthesizer>(synthesizer: S) -> Self {
        Self(Arc::new(Mutex::new(synthesizer)))
    }

    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<EncodedPayload> {
        self.0.lock().synthesize(request)
    }
}

impl std::fmt::Debug for SynthesizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizerHandle").finish_non_exhaustive()
    }
}

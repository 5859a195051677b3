//! `StubSynthesizer` — offline backend that renders a deterministic tone.
//!
//! Produces a real PCM16 payload (sine burst with a short fade-out) so the
//! full decode → play → export pipeline can be exercised end-to-end with no
//! network and no API key.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::debug;

use crate::audio::decode::{EncodedPayload, PcmFormat};
use crate::error::Result;
use crate::synth::{SpeechSynthesizer, SynthesisRequest};

/// Clip length per request.
const STUB_DURATION_SECS: f32 = 0.5;
const STUB_AMPLITUDE: f32 = 0.4;
/// Cycle of fundamentals so consecutive requests are audibly distinct.
const STUB_PITCHES_HZ: [f32; 4] = [220.0, 277.18, 329.63, 440.0];

/// Tone-burst stub backend.
pub struct StubSynthesizer {
    request_count: u32,
}

impl StubSynthesizer {
    pub fn new() -> Self {
        Self { request_count: 0 }
    }
}

impl Default for StubSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for StubSynthesizer {
    fn synthesize(&mut self, request: &SynthesisRequest) -> Result<EncodedPayload> {
        let format = PcmFormat::SERVICE;
        let pitch = STUB_PITCHES_HZ[self.request_count as usize % STUB_PITCHES_HZ.len()];
        self.request_count += 1;

        let frames = (format.sample_rate as f32 * STUB_DURATION_SECS) as usize;
        let fade_frames = frames / 8;
        let mut bytes = Vec::with_capacity(frames * 2);

        for i in 0..frames {
            let t = i as f32 / format.sample_rate as f32;
            let envelope = if i + fade_frames >= frames {
                (frames - i) as f32 / fade_frames as f32
            } else {
                1.0
            };
            let sample = (std::f32::consts::TAU * pitch * t).sin() * STUB_AMPLITUDE * envelope;
            bytes.extend_from_slice(&((sample * 32767.0) as i16).to_le_bytes());
        }

        debug!(
            pitch,
            frames,
            prompt_len = request.prompt.len(),
            voice = request.voice_name.as_str(),
            "stub synthesis"
        );

        Ok(EncodedPayload::new(BASE64.encode(&bytes)))
    }
}

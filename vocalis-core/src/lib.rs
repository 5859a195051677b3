//! # vocalis-core
//!
//! Speech-audio pipeline SDK for the Vocalis voice studio.
//!
//! ## Architecture
//!
//! ```text
//! SpeechSynthesizer ──EncodedPayload──► decode ──► Arc<SampleBuffer>
//!                                                      │
//!                               ┌──────────────────────┴─────────────┐
//!                               │                                    │
//!                        export (WAV container)            PlaybackController
//!                                                                    │
//!                                                     sink ──► analysis tap (SPSC)
//!                                                                    │
//!                                                    SpectrumAnalyzer ──► render_tick
//! ```
//!
//! The sink callback is zero-alloc. Buffers are immutable after decode and
//! cross threads as `Arc`. The tap is observational only — readers can come
//! and go without playback noticing.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod error;
pub mod events;
pub mod export;
pub mod playback;
pub mod spectrum;
pub mod synth;

// Convenience re-exports for downstream crates
pub use audio::decode::{decode, EncodedPayload, PcmFormat};
pub use audio::wav;
pub use buffering::buffer::SampleBuffer;
pub use error::VocalisError;
pub use events::{EndReason, EventKind, PlaybackEvent, StudioEvent};
pub use export::{export, ExportFormat};
pub use playback::{session::NullSink, session::OutputSink, PlaybackController, PlayerStatus};
pub use spectrum::{render_tick, CanvasSize, RenderLoop, SpectrumAnalyzer, SpectrumFrame};
pub use synth::{stub::StubSynthesizer, SpeechSynthesizer, SynthesisRequest, SynthesizerHandle};

pub use audio::CpalSink;

#[cfg(feature = "remote-api")]
pub use synth::{GeminiConfig, GeminiSynthesizer};

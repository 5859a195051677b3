//! Frequency-domain visualization of the playback signal.
//!
//! Split into three pieces so the drawing surface stays swappable:
//!
//! 1. [`analyzer::SpectrumAnalyzer`] — drains the controller's analysis tap
//!    and folds an FFT into per-bar magnitudes in [0, 1].
//! 2. [`render::render_tick`] — pure function from a magnitude frame to
//!    draw commands; owns no surface and schedules nothing.
//! 3. [`render::RenderLoop`] — thin adapter that runs the tick at display
//!    rate and cancels cleanly on unmount.

pub mod analyzer;
pub mod render;

pub use analyzer::{SpectrumAnalyzer, SpectrumFrame, DEFAULT_BAR_COUNT};
pub use render::{render_tick, CanvasSize, DrawCommand, RenderLoop, RenderSurface};

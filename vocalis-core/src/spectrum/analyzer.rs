//! Spectrum analysis over the playback tap.
//!
//! The analyzer keeps the most recent `FFT_SIZE` mono samples in a sliding
//! window, applies a Hann window, and folds the positive-frequency bins into
//! a small number of display bars (per-bar peak). Magnitudes are normalized
//! to [0, 1] here — consumers never see raw FFT output. Between frames the
//! bars decay exponentially, so short transients stay visible and the
//! display falls back smoothly when the signal (or the whole tap) goes away.

use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::buffering::{Consumer, TapConsumer};

/// Transform length. 2048 samples ≈ 85 ms at 24 kHz.
pub const FFT_SIZE: usize = 2048;

/// Default number of display bars derived from the transform.
pub const DEFAULT_BAR_COUNT: usize = 64;

/// Per-poll exponential release factor (attack is instantaneous).
const DECAY: f32 = 0.65;

/// How many samples to pull from the tap per drain iteration.
const DRAIN_CHUNK: usize = 4096;

/// One per-bar magnitude snapshot, values in [0, 1]. Ephemeral.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    bars: Vec<f32>,
}

impl SpectrumFrame {
    /// A flat all-zero frame, used when nothing is playing.
    pub fn idle(bar_count: usize) -> Self {
        Self {
            bars: vec![0.0; bar_count],
        }
    }

    /// Build a frame from raw magnitudes, clamping each into [0, 1].
    pub fn from_bars(bars: Vec<f32>) -> Self {
        Self {
            bars: bars.into_iter().map(|m| m.clamp(0.0, 1.0)).collect(),
        }
    }

    pub fn bars(&self) -> &[f32] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Consumes tap samples and produces [`SpectrumFrame`]s on demand.
///
/// Purely observational: reads whatever the current session has pushed and
/// never blocks playback. Survives across sessions — the shared tap slot it
/// polls is repopulated by the controller on every `play()`.
pub struct SpectrumAnalyzer {
    tap: Arc<Mutex<Option<TapConsumer>>>,
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    window: Vec<f32>,
    fft_scratch: Vec<Complex<f32>>,
    drain_scratch: Vec<f32>,
    smoothed: Vec<f32>,
    bar_count: usize,
}

impl SpectrumAnalyzer {
    pub fn new(tap: Arc<Mutex<Option<TapConsumer>>>, bar_count: usize) -> Self {
        let bar_count = bar_count.clamp(1, FFT_SIZE / 2);
        let fft = FftPlanner::new().plan_fft_forward(FFT_SIZE);
        let hann = (0..FFT_SIZE)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos())
            })
            .collect();

        Self {
            tap,
            fft,
            hann,
            window: Vec::with_capacity(FFT_SIZE),
            fft_scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            drain_scratch: vec![0.0; DRAIN_CHUNK],
            smoothed: vec![0.0; bar_count],
            bar_count,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Drain the tap and produce the next magnitude snapshot.
    pub fn poll(&mut self) -> SpectrumFrame {
        let drained = self.drain_tap();

        if !drained {
            // Tap gone (session torn down): forget stale samples and let
            // the bars release toward zero.
            self.window.clear();
        }

        if self.window.is_empty() {
            for bar in &mut self.smoothed {
                *bar *= DECAY;
                if *bar < 1e-4 {
                    *bar = 0.0;
                }
            }
            return SpectrumFrame {
                bars: self.smoothed.clone(),
            };
        }

        self.run_fft();
        self.fold_bars();

        SpectrumFrame {
            bars: self.smoothed.clone(),
        }
    }

    /// Pull everything new out of the tap into the sliding window.
    /// Returns false if no tap is installed.
    fn drain_tap(&mut self) -> bool {
        let mut guard = self.tap.lock();
        let Some(consumer) = guard.as_mut() else {
            return false;
        };

        loop {
            let n = consumer.pop_slice(&mut self.drain_scratch);
            if n == 0 {
                break;
            }
            self.window.extend_from_slice(&self.drain_scratch[..n]);
        }

        if self.window.len() > FFT_SIZE {
            let excess = self.window.len() - FFT_SIZE;
            self.window.drain(..excess);
        }
        true
    }

    fn run_fft(&mut self) {
        // Left-pad a short window with silence so early frames still render.
        let pad = FFT_SIZE - self.window.len();
        for (i, slot) in self.fft_scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { self.window[i - pad] };
            *slot = Complex::new(sample * self.hann[i], 0.0);
        }
        self.fft.process(&mut self.fft_scratch);
    }

    fn fold_bars(&mut self) {
        let bins = FFT_SIZE / 2;
        let bins_per_bar = (bins / self.bar_count).max(1);
        // Hann halves the coherent gain and a real tone splits across ±f,
        // so 4/N brings a full-scale sine to ≈ 1.0.
        let norm = 4.0 / FFT_SIZE as f32;

        for (bar, slot) in self.smoothed.iter_mut().enumerate() {
            let start = bar * bins_per_bar;
            let end = ((bar + 1) * bins_per_bar).min(bins);

            let mut peak = 0.0f32;
            for bin in &self.fft_scratch[start..end] {
                peak = peak.max(bin.norm() * norm);
            }
            let magnitude = peak.min(1.0);

            // Instant attack, exponential release.
            *slot = magnitude.max(*slot * DECAY);
        }
    }
}

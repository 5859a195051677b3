//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! ## Design
//!
//! Generated buffers arrive at the service rate (24 kHz). Output devices
//! negotiate their own rate (commonly 44.1 or 48 kHz). `RateConverter`
//! bridges that gap on the playback worker thread, before the stream opens,
//! where allocation is allowed.
//!
//! When source rate == target rate, `RateConverter` is a zero-copy
//! passthrough — no rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::buffering::buffer::SampleBuffer;
use crate::error::{Result, VocalisError};

/// Input frame count per rubato call.
const CHUNK_SIZE: usize = 1024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer — holds partial input chunks between calls.
    input_buf: Vec<f32>,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter from `source_rate` to `target_rate` (Hz).
    ///
    /// # Errors
    /// Returns `VocalisError::AudioDevice` if rubato fails to initialise.
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self> {
        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                output_buf: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / source_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            CHUNK_SIZE,
            1, // mono planes, one converter per channel
        )
        .map_err(|e| VocalisError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            output_buf,
        })
    }

    /// Process incoming samples, returning converted output (may be empty).
    ///
    /// Samples are accumulated internally until a full chunk is available
    /// for rubato. Any remainder is kept for the next call or `finish()`.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            // Zero-copy passthrough
            return samples.to_vec();
        };

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();

        while self.input_buf.len() >= CHUNK_SIZE {
            let input_slice = &self.input_buf[..CHUNK_SIZE];

            match resampler.process_into_buffer(&[input_slice], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.output_buf[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }

            self.input_buf.drain(..CHUNK_SIZE);
        }

        result
    }

    /// Flush the converter: pad the buffered tail to one full chunk of
    /// silence and process it. The padding also pushes the resampler's
    /// small internal delay out, at the cost of a few ms of trailing
    /// silence. Call once, after the last `process`.
    pub fn finish(&mut self) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return std::mem::take(&mut self.input_buf);
        };

        self.input_buf.resize(CHUNK_SIZE, 0.0);
        let input_slice = &self.input_buf[..CHUNK_SIZE];

        let mut result = Vec::new();
        match resampler.process_into_buffer(&[input_slice], &mut self.output_buf, None) {
            Ok((_consumed, produced)) => {
                result.extend_from_slice(&self.output_buf[0][..produced]);
            }
            Err(e) => error!("resampler flush error: {e}"),
        }
        self.input_buf.clear();
        result
    }

    /// Returns `true` when source rate == target rate (no conversion occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

/// Convert every channel plane of `buffer` to `target_rate`.
///
/// Returns the planes unchanged (cloned) when the rates already match.
pub fn convert_buffer(buffer: &SampleBuffer, target_rate: u32) -> Result<Vec<Vec<f32>>> {
    if buffer.sample_rate() == target_rate {
        return Ok(buffer.channels().to_vec());
    }

    let mut planes = Vec::with_capacity(buffer.channel_count() as usize);
    for plane in buffer.channels() {
        let mut converter = RateConverter::new(buffer.sample_rate(), target_rate)?;
        let mut out = converter.process(plane);
        out.extend(converter.finish());
        planes.push(out);
    }

    // Converters are driven identically, but trim defensively so the
    // equal-length invariant survives any rounding drift.
    let min_len = planes.iter().map(Vec::len).min().unwrap_or(0);
    for plane in &mut planes {
        plane.truncate(min_len);
    }

    Ok(planes)
}

//! Decoded multi-channel audio held as per-channel sample planes.

use crate::error::{Result, VocalisError};

/// A decoded, normalized audio clip.
///
/// Samples are f32 in [-1.0, 1.0], one `Vec` per channel, all channels the
/// same length. Buffers are never mutated after decode — share them as
/// `Arc<SampleBuffer>` between the playback controller and the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Build a buffer from per-channel planes.
    ///
    /// # Errors
    /// Returns `VocalisError::ChannelMismatch` if the planes differ in
    /// length, and `VocalisError::MalformedPayload` if no channels are given.
    pub fn from_channels(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(VocalisError::MalformedPayload(
                "buffer needs at least one channel".into(),
            ));
        };
        let frames = first.len();
        if channels.iter().any(|c| c.len() != frames) {
            let total: usize = channels.iter().map(Vec::len).sum();
            return Err(VocalisError::ChannelMismatch {
                samples: total,
                channels: channels.len() as u16,
            });
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Frames per channel (one frame = one sample across all channels).
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Duration of the clip in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Frame `index` mixed down to a single mono sample (channel average).
    pub fn mono_frame(&self, index: usize) -> f32 {
        let sum: f32 = self.channels.iter().map(|c| c[index]).sum();
        sum / self.channels.len() as f32
    }
}

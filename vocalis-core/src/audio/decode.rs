//! Sample decoder: generation-service payload → `SampleBuffer`.
//!
//! The service returns raw signed 16-bit little-endian PCM, interleaved by
//! channel, wrapped in base64 for transport. Decoding is a pure function:
//! no side effects beyond allocating the output planes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffering::buffer::SampleBuffer;
use crate::error::{Result, VocalisError};

/// Opaque text-encoded audio blob as received from the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedPayload(pub String);

impl EncodedPayload {
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Wire format of the PCM stream inside an `EncodedPayload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    /// What the generation service actually emits: 24 kHz mono.
    pub const SERVICE: Self = Self {
        sample_rate: 24_000,
        channels: 1,
    };
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::SERVICE
    }
}

/// Decode a transport payload into a normalized sample buffer.
///
/// # Errors
/// - `VocalisError::MalformedPayload` if the blob is not valid base64 or the
///   decoded byte length is not a multiple of 2 (each sample is 2 bytes).
/// - `VocalisError::ChannelMismatch` if the sample count does not divide
///   evenly across `format.channels`.
pub fn decode(payload: &EncodedPayload, format: PcmFormat) -> Result<SampleBuffer> {
    let bytes = BASE64
        .decode(payload.as_str())
        .map_err(|e| VocalisError::MalformedPayload(format!("invalid base64: {e}")))?;
    decode_pcm16le(&bytes, format)
}

/// Decode raw interleaved PCM16LE bytes into a normalized sample buffer.
pub fn decode_pcm16le(bytes: &[u8], format: PcmFormat) -> Result<SampleBuffer> {
    if bytes.len() % 2 != 0 {
        return Err(VocalisError::MalformedPayload(format!(
            "{} bytes is not a whole number of 16-bit samples",
            bytes.len()
        )));
    }

    let channels = format.channels as usize;
    let sample_count = bytes.len() / 2;
    if channels == 0 || sample_count % channels != 0 {
        return Err(VocalisError::ChannelMismatch {
            samples: sample_count,
            channels: format.channels,
        });
    }

    let frames = sample_count / channels;
    let mut planes = vec![Vec::with_capacity(frames); channels];

    // Interleaved sample i belongs to channel i % channels, frame i / channels.
    // Dividing by 32768 maps [-32768, 32767] onto [-1.0, 0.999969…]; the
    // asymmetry at +32767 matches the service's reference decoder and must
    // not be rescaled.
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        planes[i % channels].push(sample as f32 / 32768.0);
    }

    debug!(
        frames,
        channels,
        sample_rate = format.sample_rate,
        "decoded pcm payload"
    );

    SampleBuffer::from_channels(format.sample_rate, planes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(bytes: &[u8]) -> EncodedPayload {
        EncodedPayload::new(BASE64.encode(bytes))
    }

    #[test]
    fn even_byte_length_decodes_to_matching_sample_count() {
        let bytes: Vec<u8> = (0..64).collect();
        let buf = decode(&payload_of(&bytes), PcmFormat::SERVICE).unwrap();
        assert_eq!(buf.frames() * buf.channel_count() as usize * 2, bytes.len());
    }

    #[test]
    fn odd_byte_length_is_malformed() {
        let err = decode_pcm16le(&[0u8; 7], PcmFormat::SERVICE);
        assert!(matches!(err, Err(VocalisError::MalformedPayload(_))));
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let err = decode(&EncodedPayload::new("@@not base64@@"), PcmFormat::SERVICE);
        assert!(matches!(err, Err(VocalisError::MalformedPayload(_))));
    }

    #[test]
    fn sample_count_must_divide_across_channels() {
        // 3 samples, 2 channels
        let err = decode_pcm16le(
            &[0, 0, 0, 0, 0, 0],
            PcmFormat {
                sample_rate: 24_000,
                channels: 2,
            },
        );
        assert!(matches!(
            err,
            Err(VocalisError::ChannelMismatch {
                samples: 3,
                channels: 2
            })
        ));
    }

    #[test]
    fn scaling_preserves_the_positive_asymmetry() {
        let bytes = [
            0x00, 0x80, // -32768
            0xFF, 0x7F, // +32767
            0x00, 0x00, // 0
        ];
        let buf = decode_pcm16le(&bytes, PcmFormat::SERVICE).unwrap();
        let ch = buf.channel(0);
        assert_eq!(ch[0], -1.0);
        assert!((ch[1] - 0.999_969_5).abs() < 1e-6, "got {}", ch[1]);
        assert!(ch[1] < 1.0, "+32767 must not map to exactly 1.0");
        assert_eq!(ch[2], 0.0);
    }

    #[test]
    fn stereo_deinterleaves_by_modulo() {
        // Frames: (100, -100), (200, -200) interleaved L R L R
        let mut bytes = Vec::new();
        for v in [100i16, -100, 200, -200] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let buf = decode_pcm16le(
            &bytes,
            PcmFormat {
                sample_rate: 24_000,
                channels: 2,
            },
        )
        .unwrap();
        assert_eq!(buf.frames(), 2);
        assert_eq!(buf.channel(0), &[100.0 / 32768.0, 200.0 / 32768.0]);
        assert_eq!(buf.channel(1), &[-100.0 / 32768.0, -200.0 / 32768.0]);
    }
}

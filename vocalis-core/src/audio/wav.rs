//! Container encoder: `SampleBuffer` → canonical RIFF/WAVE PCM16 bytes.
//!
//! The output is byte-exact: a 44-byte header (RIFF descriptor, `fmt `
//! block, `data` header) followed by interleaved little-endian i16 frames.
//! Total length is always `44 + frames × channels × 2`. Encoding the same
//! buffer twice yields identical bytes.

use tracing::debug;

use crate::buffering::buffer::SampleBuffer;

/// Fixed header size of the canonical container.
pub const HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const FORMAT_PCM: u16 = 1;

/// Quantize a normalized sample to i16.
///
/// Clamps to [-1.0, 1.0], then scales negatives by 32768 and non-negatives
/// by 32767 with truncating conversion, so -1.0 → -32768 (0x8000) and
/// 1.0 → 32767 (0x7FFF). Mirrors the reference encoder exactly.
pub fn quantize_sample(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Serialize a buffer into a self-contained WAV file.
///
/// Infallible for any `SampleBuffer` (the buffer's constructor already
/// guarantees equal-length channel planes).
pub fn encode(buffer: &SampleBuffer) -> Vec<u8> {
    let channels = buffer.channel_count() as u32;
    let sample_rate = buffer.sample_rate();
    let data_len = (buffer.frames() as u32) * channels * 2;
    let byte_rate = sample_rate * channels * 2;
    let block_align = (channels * 2) as u16;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);

    // RIFF descriptor
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt block
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&(channels as u16).to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data block
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    // Interleave frame-major, channel-minor.
    for frame in 0..buffer.frames() {
        for plane in buffer.channels() {
            out.extend_from_slice(&quantize_sample(plane[frame]).to_le_bytes());
        }
    }

    debug_assert_eq!(out.len(), HEADER_LEN + data_len as usize);
    debug!(bytes = out.len(), sample_rate, channels, "encoded container");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::{decode_pcm16le, PcmFormat};
    use std::io::Cursor;

    fn mono(samples: Vec<f32>) -> SampleBuffer {
        SampleBuffer::from_channels(24_000, vec![samples]).unwrap()
    }

    #[test]
    fn length_is_header_plus_data() {
        for frames in [0usize, 1, 7, 480] {
            let buf = mono(vec![0.25; frames]);
            assert_eq!(encode(&buf).len(), HEADER_LEN + frames * 2);
        }
        let stereo =
            SampleBuffer::from_channels(44_100, vec![vec![0.0; 100], vec![0.0; 100]]).unwrap();
        assert_eq!(encode(&stereo).len(), HEADER_LEN + 100 * 2 * 2);
    }

    #[test]
    fn encoding_is_deterministic() {
        let buf = mono((0..480).map(|i| (i as f32 / 480.0).sin()).collect());
        assert_eq!(encode(&buf), encode(&buf));
    }

    #[test]
    fn extreme_samples_quantize_exactly() {
        assert_eq!(quantize_sample(1.0), 0x7FFF);
        assert_eq!(quantize_sample(-1.0), -32768);
        assert_eq!(quantize_sample(0.0), 0);
        // Out-of-range input clamps rather than wrapping.
        assert_eq!(quantize_sample(2.0), 0x7FFF);
        assert_eq!(quantize_sample(-2.0), -32768);
    }

    #[test]
    fn two_second_silent_mono_clip_has_reference_header() {
        let buf = mono(vec![0.0; 48_000]); // 2 s at 24 kHz
        let bytes = encode(&buf);
        assert_eq!(bytes.len(), 44 + 96_000);

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");
        // channel count at 22–23
        assert_eq!(&bytes[22..24], &[0x01, 0x00]);
        // 24 000 Hz little-endian at 24–27
        assert_eq!(&bytes[24..28], &[0x00, 0x5D, 0x00, 0x00]);
        // bits per sample at 34–35
        assert_eq!(&bytes[34..36], &[0x10, 0x00]);
        // data length at 40–43
        assert_eq!(&bytes[40..44], &96_000u32.to_le_bytes());
    }

    #[test]
    fn hound_reads_back_what_we_wrote() {
        let samples: Vec<f32> = (0..240)
            .map(|i| (i as f32 * std::f32::consts::TAU / 48.0).sin() * 0.8)
            .collect();
        let buf = mono(samples.clone());
        let bytes = encode(&buf);

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read.len(), 240);
        for (orig, got) in samples.iter().zip(&read) {
            assert_eq!(quantize_sample(*orig), *got);
        }
    }

    #[test]
    fn decode_then_encode_round_trips_within_one_step() {
        let original: Vec<i16> = (0..500).map(|i| (i * 63) as i16).collect();
        let mut bytes = Vec::new();
        for v in &original {
            bytes.extend_from_slice(&v.to_le_bytes());
        }

        let buf = decode_pcm16le(&bytes, PcmFormat::SERVICE).unwrap();
        let container = encode(&buf);
        assert_eq!(container.len(), HEADER_LEN + bytes.len());

        for (i, v) in original.iter().enumerate() {
            let off = HEADER_LEN + i * 2;
            let re = i16::from_le_bytes([container[off], container[off + 1]]);
            assert!(
                (re as i32 - *v as i32).abs() <= 1,
                "sample {i}: {v} re-encoded as {re}"
            );
        }
    }
}

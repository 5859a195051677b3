//! Frame source and sink seam for one playback session.
//!
//! `SessionSource` is the single object a sink's real-time callback owns. Its
//! `fill` methods are allocation-free after construction: they interleave
//! frames into the device buffer, push a mono mix into the analysis tap
//! (wait-free, drops on overflow), and flip the `finished` flag when the
//! clip runs out. A cleared `running` flag turns every subsequent callback
//! into pure silence, which is what makes `stop()` take effect immediately.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::audio::wav::quantize_sample;
use crate::buffering::{buffer::SampleBuffer, Producer, TapProducer};
use crate::error::Result;

/// Pulls interleaved frames out of per-channel planes for one session.
pub struct SessionSource {
    planes: Vec<Vec<f32>>,
    frames: usize,
    pos: usize,
    out_channels: usize,
    tap: TapProducer,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    mix_scratch: Vec<f32>,
    i16_scratch: Vec<f32>,
}

impl SessionSource {
    /// `planes` must already be at the sink's sample rate and all the same
    /// length. `out_channels` is the device channel count; buffer channel
    /// `c % plane_count` feeds device channel `c` (mono duplicates).
    pub fn new(
        planes: Vec<Vec<f32>>,
        out_channels: usize,
        tap: TapProducer,
        running: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let frames = planes.first().map(Vec::len).unwrap_or(0);
        Self {
            planes,
            frames,
            pos: 0,
            out_channels: out_channels.max(1),
            tap,
            running,
            finished,
            // Sized for the largest callback buffers seen in practice, so
            // the RT path does not grow them.
            mix_scratch: Vec::with_capacity(8192),
            i16_scratch: Vec::with_capacity(8192),
        }
    }

    /// Fill an f32 device buffer. Silence after stop or exhaustion.
    pub fn fill(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        if !self.running.load(Ordering::Relaxed) {
            return;
        }
        if self.pos >= self.frames {
            self.finished.store(true, Ordering::Release);
            return;
        }

        let want = out.len() / self.out_channels;
        let take = want.min(self.frames - self.pos);
        let plane_count = self.planes.len();

        self.mix_scratch.clear();
        for f in 0..take {
            let src = self.pos + f;
            let mut sum = 0f32;
            for c in 0..self.out_channels {
                let sample = self.planes[c % plane_count][src];
                out[f * self.out_channels + c] = sample;
            }
            for plane in &self.planes {
                sum += plane[src];
            }
            self.mix_scratch.push(sum / plane_count as f32);
        }

        // Tap is observational: a full ring (no reader, slow reader) just
        // drops samples, never blocks the callback.
        let _ = self.tap.push_slice(&self.mix_scratch);

        self.pos += take;
        if self.pos >= self.frames {
            self.finished.store(true, Ordering::Release);
        }
    }

    /// Fill an i16 device buffer via the container quantizer.
    pub fn fill_i16(&mut self, out: &mut [i16]) {
        self.i16_scratch.resize(out.len(), 0.0);
        let mut scratch = std::mem::take(&mut self.i16_scratch);
        self.fill(&mut scratch);
        for (dst, src) in out.iter_mut().zip(&scratch) {
            *dst = quantize_sample(*src);
        }
        self.i16_scratch = scratch;
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.frames
    }
}

/// Seam between the playback controller and the actual audio output.
///
/// Implementations must send exactly one message on `open_tx`: `Ok(rate)`
/// once output has begun at `rate` Hz, or `Err` if the sink cannot open.
/// `run` blocks its (worker) thread until the session ends — `running`
/// cleared or the source exhausted — and returns whether the sink opened.
pub trait OutputSink: Send + Sync + 'static {
    fn run(
        &self,
        buffer: Arc<SampleBuffer>,
        tap: TapProducer,
        running: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
        open_tx: Sender<Result<u32>>,
    ) -> bool;
}

/// Sink that consumes frames without touching audio hardware.
///
/// Paces itself to real time by default so session lifetimes match the clip
/// duration; `instant()` drops the pacing for tests that only care about
/// state transitions.
pub struct NullSink {
    realtime: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self { realtime: true }
    }

    /// Consume the whole buffer as fast as the loop spins.
    pub fn instant() -> Self {
        Self { realtime: false }
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for NullSink {
    fn run(
        &self,
        buffer: Arc<SampleBuffer>,
        tap: TapProducer,
        running: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
        open_tx: Sender<Result<u32>>,
    ) -> bool {
        const CHUNK_FRAMES: usize = 512;

        let rate = buffer.sample_rate();
        let channels = buffer.channel_count() as usize;
        let mut source = SessionSource::new(
            buffer.channels().to_vec(),
            channels,
            tap,
            Arc::clone(&running),
            Arc::clone(&finished),
        );

        let _ = open_tx.send(Ok(rate));

        let mut scratch = vec![0f32; CHUNK_FRAMES * channels];
        let chunk_duration = Duration::from_secs_f64(CHUNK_FRAMES as f64 / rate as f64);

        while running.load(Ordering::Acquire) && !finished.load(Ordering::Acquire) {
            source.fill(&mut scratch);
            if self.realtime {
                std::thread::sleep(chunk_duration);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffering::{create_analysis_tap, Consumer};

    fn flags() -> (Arc<AtomicBool>, Arc<AtomicBool>) {
        (
            Arc::new(AtomicBool::new(true)),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn fill_interleaves_and_sets_finished_at_end() {
        let (tap_prod, _tap_cons) = create_analysis_tap();
        let (running, finished) = flags();
        let planes = vec![vec![0.1f32, 0.2, 0.3], vec![-0.1f32, -0.2, -0.3]];
        let mut source = SessionSource::new(planes, 2, tap_prod, running, finished.clone());

        let mut out = vec![0f32; 8]; // room for 4 frames, only 3 exist
        source.fill(&mut out);
        assert_eq!(&out[..6], &[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);
        assert_eq!(&out[6..], &[0.0, 0.0], "tail past the clip stays silent");
        assert!(source.is_exhausted());
        assert!(finished.load(Ordering::Acquire));
    }

    #[test]
    fn mono_plane_duplicates_across_device_channels() {
        let (tap_prod, _tap_cons) = create_analysis_tap();
        let (running, finished) = flags();
        let mut source =
            SessionSource::new(vec![vec![0.5f32, 0.25]], 2, tap_prod, running, finished);

        let mut out = vec![0f32; 4];
        source.fill(&mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn cleared_running_flag_silences_immediately() {
        let (tap_prod, _tap_cons) = create_analysis_tap();
        let (running, finished) = flags();
        let mut source = SessionSource::new(
            vec![vec![0.9f32; 100]],
            1,
            tap_prod,
            Arc::clone(&running),
            finished,
        );

        running.store(false, Ordering::Release);
        let mut out = vec![1.0f32; 32];
        source.fill(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
        assert!(!source.is_exhausted(), "stop is not completion");
    }

    #[test]
    fn tap_receives_mono_mix() {
        let (tap_prod, mut tap_cons) = create_analysis_tap();
        let (running, finished) = flags();
        let planes = vec![vec![1.0f32, 0.0], vec![0.0f32, 1.0]];
        let mut source = SessionSource::new(planes, 2, tap_prod, running, finished);

        let mut out = vec![0f32; 4];
        source.fill(&mut out);

        let mut tapped = vec![0f32; 4];
        let n = tap_cons.pop_slice(&mut tapped);
        assert_eq!(&tapped[..n], &[0.5, 0.5]);
    }

    #[test]
    fn i16_fill_quantizes_through_the_container_path() {
        let (tap_prod, _tap_cons) = create_analysis_tap();
        let (running, finished) = flags();
        let mut source =
            SessionSource::new(vec![vec![1.0f32, -1.0, 0.0]], 1, tap_prod, running, finished);

        let mut out = vec![0i16; 3];
        source.fill_i16(&mut out);
        assert_eq!(out, vec![0x7FFF, -32768, 0]);
    }

    #[test]
    fn null_sink_drains_and_reports_open() {
        let buffer = Arc::new(
            SampleBuffer::from_channels(24_000, vec![vec![0.0f32; 2048]]).unwrap(),
        );
        let (tap_prod, _tap_cons) = create_analysis_tap();
        let (running, finished) = flags();
        let (open_tx, open_rx) = crossbeam_channel::bounded(1);

        let opened = NullSink::instant().run(
            buffer,
            tap_prod,
            Arc::clone(&running),
            Arc::clone(&finished),
            open_tx,
        );

        assert!(opened);
        assert_eq!(open_rx.recv().unwrap().unwrap(), 24_000);
        assert!(finished.load(Ordering::Acquire));
    }
}

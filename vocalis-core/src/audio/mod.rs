//! Audio output via cpal backend.
//!
//! # Design constraints
//!
//! The cpal output callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Allocate heap memory
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! This module satisfies that contract by pulling frames from a
//! pre-converted `SessionSource` whose scratch buffers are allocated up
//! front and whose analysis-tap `push_slice` is lock-free.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `CpalSink::run` therefore creates and drops the stream on the
//! playback worker thread that calls it.

pub mod decode;
pub mod device;
pub mod resample;
pub mod wav;

use std::sync::{atomic::AtomicBool, Arc};

#[cfg(feature = "audio-cpal")]
use std::sync::atomic::Ordering;
#[cfg(feature = "audio-cpal")]
use std::time::Duration;

use crossbeam_channel::Sender;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, StreamConfig,
};

use crate::{
    buffering::{buffer::SampleBuffer, TapProducer},
    error::Result,
    playback::session::OutputSink,
};

#[cfg(feature = "audio-cpal")]
use crate::{
    audio::resample::convert_buffer, error::VocalisError, playback::session::SessionSource,
};

#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// How often the worker checks for stop/completion while the stream runs.
#[cfg(feature = "audio-cpal")]
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Grace period after the last frame so the device drains its final buffer.
#[cfg(feature = "audio-cpal")]
const DRAIN_GRACE: Duration = Duration::from_millis(60);

/// Hardware sink backed by the system's default (or a named) output device.
#[derive(Debug, Clone, Default)]
pub struct CpalSink {
    /// Preferred output device name; `None` uses the system default.
    pub preferred_device: Option<String>,
}

impl CpalSink {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self { preferred_device }
    }
}

#[cfg(feature = "audio-cpal")]
impl OutputSink for CpalSink {
    fn run(
        &self,
        buffer: Arc<SampleBuffer>,
        tap: TapProducer,
        running: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
        open_tx: Sender<Result<u32>>,
    ) -> bool {
        let host = cpal::default_host();

        let mut selected_device = None;
        if let Some(preferred_name) = self.preferred_device.as_deref() {
            match host.output_devices() {
                Ok(mut devices) => {
                    selected_device = devices.find(|device| {
                        device
                            .name()
                            .map(|name| name == preferred_name)
                            .unwrap_or(false)
                    });
                    if selected_device.is_none() {
                        warn!(
                            "preferred output device '{}' not found, falling back",
                            preferred_name
                        );
                    }
                }
                Err(e) => {
                    warn!("failed to list output devices while resolving preference: {e}");
                }
            }
        }

        let device = match selected_device.or_else(|| host.default_output_device()) {
            Some(d) => d,
            None => {
                let _ = open_tx.send(Err(VocalisError::NoDefaultOutputDevice));
                return false;
            }
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening output device"
        );

        let supported = match device.default_output_config() {
            Ok(c) => c,
            Err(e) => {
                let _ = open_tx.send(Err(VocalisError::AudioDevice(e.to_string())));
                return false;
            }
        };

        let device_rate = supported.sample_rate().0;
        let device_channels = supported.channels();

        info!(device_rate, device_channels, "output config selected");

        // Rate conversion happens here, on the worker, never in the callback.
        let planes = match convert_buffer(&buffer, device_rate) {
            Ok(p) => p,
            Err(e) => {
                let _ = open_tx.send(Err(e));
                return false;
            }
        };

        let config = StreamConfig {
            channels: device_channels,
            sample_rate: SampleRate(device_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut source = SessionSource::new(
            planes,
            device_channels as usize,
            tap,
            Arc::clone(&running),
            Arc::clone(&finished),
        );

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _info| source.fill(data),
                |err| error!("audio stream error: {err}"),
                None,
            ),
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _info| source.fill_i16(data),
                |err| error!("audio stream error: {err}"),
                None,
            ),
            fmt => {
                let _ = open_tx.send(Err(VocalisError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                ))));
                return false;
            }
        };

        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                let _ = open_tx.send(Err(VocalisError::AudioStream(e.to_string())));
                return false;
            }
        };

        if let Err(e) = stream.play() {
            let _ = open_tx.send(Err(VocalisError::AudioStream(e.to_string())));
            return false;
        }

        let _ = open_tx.send(Ok(device_rate));

        while running.load(Ordering::Acquire) && !finished.load(Ordering::Acquire) {
            std::thread::sleep(POLL_INTERVAL);
        }
        if finished.load(Ordering::Acquire) {
            std::thread::sleep(DRAIN_GRACE);
        }

        // Stream drops here, releasing the device on this thread.
        drop(stream);
        true
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl OutputSink for CpalSink {
    fn run(
        &self,
        _buffer: Arc<SampleBuffer>,
        _tap: TapProducer,
        _running: Arc<AtomicBool>,
        _finished: Arc<AtomicBool>,
        open_tx: Sender<Result<u32>>,
    ) -> bool {
        let _ = open_tx.send(Err(crate::error::VocalisError::AudioStream(
            "compiled without audio-cpal feature".into(),
        )));
        false
    }
}

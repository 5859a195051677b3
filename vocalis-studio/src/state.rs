//! Shared studio state — everything the command layer operates on.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::Local;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use vocalis_core::{
    events::{EndReason, EventKind, PlaybackEvent, StudioEvent},
    playback::{session::OutputSink, PlaybackController},
    synth::SynthesizerHandle,
};

use crate::profiles::VoiceLibrary;
use crate::settings::StudioSettings;

/// Rolling generation-log capacity (newest first).
const LOG_CAP: usize = 100;

/// Bounded, newest-first log of human-readable event lines.
pub struct EventLog {
    entries: Mutex<VecDeque<String>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(LOG_CAP)),
        }
    }

    pub fn push(&self, line: String) {
        let mut entries = self.entries.lock();
        entries.push_front(line);
        entries.truncate(LOG_CAP);
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// The studio: profile library, playback, synthesis backend, settings, log.
///
/// All state lives here explicitly — nothing global. Share as `Arc<Studio>`
/// between the console front end and any background consumers.
pub struct Studio {
    pub library: Mutex<VoiceLibrary>,
    pub controller: Arc<PlaybackController>,
    pub synthesizer: SynthesizerHandle,
    pub settings: Mutex<StudioSettings>,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
    /// Container bytes of the most recent successful generation, kept ready
    /// so the download control works without re-encoding.
    pub last_wav: Mutex<Option<Vec<u8>>>,
    pub log: EventLog,
    /// Monotonically increasing event sequence counter.
    seq: AtomicU64,
}

impl Studio {
    pub fn new(
        synthesizer: SynthesizerHandle,
        sink: Arc<dyn OutputSink>,
        settings: StudioSettings,
        settings_path: PathBuf,
    ) -> Self {
        Self {
            library: Mutex::new(VoiceLibrary::seeded()),
            controller: Arc::new(PlaybackController::new(sink)),
            synthesizer,
            settings: Mutex::new(settings),
            settings_path,
            last_wav: Mutex::new(None),
            log: EventLog::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// Emit one structured event: timestamped log line + tracing output.
    pub fn emit(&self, kind: EventKind, detail: Option<String>) -> StudioEvent {
        let event = StudioEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            kind,
            detail,
        };

        let timestamp = Local::now().format("%H:%M:%S");
        let line = match &event.detail {
            Some(detail) => format!("[{timestamp}] {}: {detail}", event.kind.label()),
            None => format!("[{timestamp}] {}", event.kind.label()),
        };

        if event.kind == EventKind::Error {
            error!("{line}");
        } else {
            info!("{line}");
        }
        self.log.push(line);

        event
    }

    /// Push a timestamped progress line that is not a structured event.
    pub fn note(&self, message: impl Into<String>) {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message.into());
        info!("{line}");
        self.log.push(line);
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.lines()
    }
}

/// Forward playback lifecycle events into the studio log.
///
/// This is the one place `PlaybackStarted`/`PlaybackStopped` studio events
/// come from, so explicit stops and natural completions log identically and
/// the UI state stays consistent without polling.
pub fn spawn_event_forwarder(studio: Arc<Studio>) -> std::io::Result<std::thread::JoinHandle<()>> {
    let mut rx = studio.controller.subscribe();
    std::thread::Builder::new()
        .name("vocalis-events".into())
        .spawn(move || loop {
            match rx.blocking_recv() {
                Ok(PlaybackEvent::Started {
                    frames,
                    sample_rate,
                }) => {
                    studio.emit(
                        EventKind::PlaybackStarted,
                        Some(format!(
                            "{:.2} s at {sample_rate} Hz",
                            frames as f64 / sample_rate as f64
                        )),
                    );
                }
                Ok(PlaybackEvent::Ended { reason }) => {
                    let detail = match reason {
                        EndReason::Completed => "completed",
                        EndReason::Stopped => "stopped",
                    };
                    studio.emit(EventKind::PlaybackStopped, Some(detail.into()));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("playback event forwarder lagged, skipped {skipped}");
                }
                Err(RecvError::Closed) => break,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocalis_core::{playback::session::NullSink, StubSynthesizer};

    fn studio() -> Studio {
        Studio::new(
            SynthesizerHandle::new(StubSynthesizer::new()),
            Arc::new(NullSink::instant()),
            StudioSettings::default(),
            PathBuf::from("/tmp/vocalis-test-settings.json"),
        )
    }

    #[test]
    fn emit_sequences_events_and_logs_newest_first() {
        let studio = studio();
        let first = studio.emit(EventKind::Decoded, Some("48000 frames".into()));
        let second = studio.emit(EventKind::PlaybackStarted, None);
        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);

        let lines = studio.log_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("playback started"));
        assert!(lines[1].contains("decoded: 48000 frames"));
    }

    #[test]
    fn log_is_bounded() {
        let studio = studio();
        for i in 0..250 {
            studio.emit(EventKind::Encoded, Some(format!("chunk {i}")));
        }
        let lines = studio.log_lines();
        assert_eq!(lines.len(), 100);
        assert!(lines[0].contains("chunk 249"), "newest entry kept");
    }

    #[test]
    fn forwarder_logs_session_start_and_natural_end() {
        use std::time::{Duration, Instant};
        use vocalis_core::SampleBuffer;

        let studio = Arc::new(studio());
        let _forwarder = spawn_event_forwarder(Arc::clone(&studio)).unwrap();

        let clip =
            Arc::new(SampleBuffer::from_channels(24_000, vec![vec![0.0f32; 2048]]).unwrap());
        studio.controller.load_buffer(clip);
        studio.controller.play().unwrap();

        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            let lines = studio.log_lines();
            let started = lines.iter().any(|l| l.contains("playback started"));
            let completed = lines
                .iter()
                .any(|l| l.contains("playback stopped: completed"));
            if started && completed {
                break;
            }
            assert!(
                Instant::now() < deadline,
                "forwarder never logged the session: {lines:?}"
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

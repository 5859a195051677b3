//! `PlaybackController` — single-session playback lifecycle.
//!
//! ## State machine
//!
//! ```text
//! Idle ──load_buffer──► Loaded ──play──► Playing
//!   ▲                     ▲│               │
//!   │                     │└───── stop ────┘
//!   └────── unload ───────┘    (or natural completion)
//! ```
//!
//! At most one session is active at a time: `play()` while `Playing`
//! returns `SessionAlreadyActive` without touching the live sink, and
//! `load_buffer`/`unload` run the full stop sequence before replacing or
//! releasing the buffer. `stop()` is idempotent and joins the session
//! worker before returning, so no queued audio survives the call.
//!
//! ## Threading
//!
//! The OS audio stream is `!Send` on Windows/macOS, so each session gets a
//! dedicated worker thread that creates and drops the stream. A bounded
//! crossbeam channel propagates sink-open success (with the negotiated
//! device rate) or failure back to the `play()` caller. Teardown —
//! clearing the tap slot, restoring `Loaded`, broadcasting
//! `PlaybackEvent::Ended` — always happens on the worker, whether the
//! session ended by stop or by running off the end of the clip.

pub mod session;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};

use crossbeam_channel::bounded;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    buffering::{buffer::SampleBuffer, create_analysis_tap, TapConsumer},
    error::{Result, VocalisError},
    events::{EndReason, PlaybackEvent},
    playback::session::OutputSink,
};

/// Broadcast capacity: 64 lifecycle events buffered for slow consumers.
const BROADCAST_CAP: usize = 64;

/// Externally visible controller status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// No buffer loaded.
    Idle,
    /// A buffer is loaded and ready to play.
    Loaded,
    /// A session is live on the sink.
    Playing,
}

enum ControllerState {
    Idle,
    Loaded(Arc<SampleBuffer>),
    Playing(Arc<SampleBuffer>),
}

/// Owns the one-and-only playback session and the hardware sink connection.
///
/// `Send + Sync` — all fields use interior mutability; wrap in `Arc` to
/// share between the host command layer and the render loop.
pub struct PlaybackController {
    state: Arc<Mutex<ControllerState>>,
    /// `true` while a session's sink is (or is becoming) live.
    running: Arc<AtomicBool>,
    /// Set by the session source when the clip plays to its last frame.
    finished: Arc<AtomicBool>,
    /// Consumer half of the current session's analysis tap. `None` between
    /// sessions; readers must tolerate absence.
    tap: Arc<Mutex<Option<TapConsumer>>>,
    events_tx: broadcast::Sender<PlaybackEvent>,
    sink: Arc<dyn OutputSink>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackController {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        let (events_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            state: Arc::new(Mutex::new(ControllerState::Idle)),
            running: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
            tap: Arc::new(Mutex::new(None)),
            events_tx,
            sink,
            worker: Mutex::new(None),
        }
    }

    pub fn status(&self) -> PlayerStatus {
        match &*self.state.lock() {
            ControllerState::Idle => PlayerStatus::Idle,
            ControllerState::Loaded(_) => PlayerStatus::Loaded,
            ControllerState::Playing(_) => PlayerStatus::Playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlayerStatus::Playing
    }

    /// The currently loaded buffer, if any (also available while playing).
    pub fn loaded_buffer(&self) -> Option<Arc<SampleBuffer>> {
        match &*self.state.lock() {
            ControllerState::Idle => None,
            ControllerState::Loaded(buf) | ControllerState::Playing(buf) => Some(Arc::clone(buf)),
        }
    }

    /// Subscribe to playback lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events_tx.subscribe()
    }

    /// Shared slot holding the live session's analysis-tap consumer.
    ///
    /// The slot is `None` whenever no session is live. Dropping or ignoring
    /// the consumer never affects playback.
    pub fn tap_handle(&self) -> Arc<Mutex<Option<TapConsumer>>> {
        Arc::clone(&self.tap)
    }

    /// Load a buffer, stopping any live session first.
    ///
    /// Replacement is atomic from the caller's perspective: the old session
    /// is fully torn down before the new buffer becomes visible.
    pub fn load_buffer(&self, buffer: Arc<SampleBuffer>) {
        self.stop();
        debug!(
            frames = buffer.frames(),
            sample_rate = buffer.sample_rate(),
            "buffer loaded"
        );
        *self.state.lock() = ControllerState::Loaded(buffer);
    }

    /// Stop any live session and release the buffer, returning to `Idle`.
    ///
    /// Used when the owning context (the active voice profile) changes, so
    /// no stale audio survives the switch.
    pub fn unload(&self) {
        self.stop();
        *self.state.lock() = ControllerState::Idle;
    }

    /// Start a playback session from frame 0 of the loaded buffer.
    ///
    /// Blocks until the sink is confirmed open (or fails), then returns;
    /// the session keeps running on its worker thread.
    ///
    /// # Errors
    /// - `VocalisError::NoBufferLoaded` from `Idle` — caller bug, non-fatal.
    /// - `VocalisError::SessionAlreadyActive` while `Playing`; the live
    ///   session is left untouched (the sink is exclusive).
    /// - Sink-open failures (`NoDefaultOutputDevice`, `AudioStream`, …);
    ///   the buffer stays loaded.
    pub fn play(&self) -> Result<()> {
        let buffer = {
            let state = self.state.lock();
            match &*state {
                ControllerState::Idle => return Err(VocalisError::NoBufferLoaded),
                ControllerState::Playing(_) => return Err(VocalisError::SessionAlreadyActive),
                ControllerState::Loaded(buf) => Arc::clone(buf),
            }
        };

        // Reap the previous worker if it ended by natural completion.
        self.join_worker();

        let (tap_prod, tap_cons) = create_analysis_tap();
        *self.tap.lock() = Some(tap_cons);

        self.finished.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        *self.state.lock() = ControllerState::Playing(Arc::clone(&buffer));

        // Sync handshake: worker signals sink-open success/failure to play().
        let (open_tx, open_rx) = bounded::<Result<u32>>(1);
        // Ordering gate: the worker must not broadcast Ended until play()
        // has broadcast Started (an instant sink can finish the whole clip
        // before play() even sees the open ack).
        let (started_tx, started_rx) = bounded::<()>(1);

        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let finished = Arc::clone(&self.finished);
        let tap_slot = Arc::clone(&self.tap);
        let events_tx = self.events_tx.clone();
        let worker_buffer = Arc::clone(&buffer);

        let spawned = thread::Builder::new()
            .name("vocalis-playback".into())
            .spawn(move || {
                // The stream is created and dropped inside run(), on this thread.
                let opened = sink.run(
                    Arc::clone(&worker_buffer),
                    tap_prod,
                    Arc::clone(&running),
                    Arc::clone(&finished),
                    open_tx,
                );

                let reason = if finished.load(Ordering::SeqCst) {
                    EndReason::Completed
                } else {
                    EndReason::Stopped
                };
                running.store(false, Ordering::SeqCst);
                *tap_slot.lock() = None;
                *state.lock() = ControllerState::Loaded(worker_buffer);

                if opened {
                    // Blocks until play() sent Started (or gave up).
                    let _ = started_rx.recv();
                    debug!(?reason, "playback session ended");
                    let _ = events_tx.send(PlaybackEvent::Ended { reason });
                }
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                *self.tap.lock() = None;
                *self.state.lock() = ControllerState::Loaded(buffer);
                return Err(VocalisError::AudioStream(format!(
                    "failed to spawn playback worker: {e}"
                )));
            }
        };

        *self.worker.lock() = Some(handle);

        match open_rx.recv() {
            Ok(Ok(rate)) => {
                info!(
                    rate,
                    frames = buffer.frames(),
                    "playback started"
                );
                let _ = self.events_tx.send(PlaybackEvent::Started {
                    frames: buffer.frames(),
                    sample_rate: rate,
                });
                let _ = started_tx.send(());
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.join_worker();
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent — worker panicked?
                self.running.store(false, Ordering::SeqCst);
                self.join_worker();
                Err(VocalisError::Other(anyhow::anyhow!(
                    "playback worker died before opening the sink"
                )))
            }
        }
    }

    /// Halt the live session. Idempotent: a no-op from `Idle`/`Loaded`.
    ///
    /// The sink callback observes the cleared running flag and emits
    /// silence from its next invocation; this call then joins the worker,
    /// so by the time it returns the session is fully torn down.
    pub fn stop(&self) {
        {
            let state = self.state.lock();
            if !matches!(&*state, ControllerState::Playing(_)) {
                return;
            }
        }
        self.running.store(false, Ordering::SeqCst);
        self.join_worker();
    }

    fn join_worker(&self) {
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join_worker();
    }
}

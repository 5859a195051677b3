//! Bar-spectrum rendering, decoupled from any drawing surface.
//!
//! [`render_tick`] is a pure function: magnitudes in, draw commands out.
//! [`RenderLoop`] is the scheduling adapter — a display-rate thread that
//! polls the analyzer while the controller is playing, submits idle frames
//! otherwise, and joins on `stop()` so nothing draws after unmount.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::playback::PlaybackController;
use crate::spectrum::analyzer::{SpectrumAnalyzer, SpectrumFrame};

/// Documented default drawable area.
pub const DEFAULT_CANVAS: CanvasSize = CanvasSize {
    width: 600.0,
    height: 96.0,
};

/// Idle bars sit at this fraction of the canvas height.
const IDLE_HEIGHT_FRACTION: f32 = 0.05;

/// ~60 Hz redraw cadence.
const TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

/// One drawing primitive. Surfaces translate these however they like
/// (canvas, terminal cells, test recorders).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum DrawCommand {
    Clear,
    #[serde(rename_all = "camelCase")]
    RoundedRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
    },
}

/// Where draw commands land. Implementations must not block the tick.
pub trait RenderSurface: Send + 'static {
    fn size(&self) -> CanvasSize;
    fn submit(&mut self, commands: &[DrawCommand]);
}

/// Map one magnitude frame to bar draw commands.
///
/// Bars are rounded rects centered vertically. Width is
/// `canvas.width / (barCount × 1.5)` with half a bar of gap between bars.
/// Height is `magnitude² × canvas.height` — the squared response keeps
/// low-energy noise visually quiet and emphasizes peaks. When `playing` is
/// false the frame is ignored and flat low-amplitude bars are emitted.
pub fn render_tick(frame: &SpectrumFrame, playing: bool, canvas: CanvasSize) -> Vec<DrawCommand> {
    let bar_count = frame.len().max(1);
    let bar_width = canvas.width / (bar_count as f32 * 1.5);
    let gap = bar_width * 0.5;

    let mut commands = Vec::with_capacity(bar_count + 1);
    commands.push(DrawCommand::Clear);

    for (i, magnitude) in frame.bars().iter().enumerate() {
        let height = if playing {
            (magnitude * magnitude * canvas.height).min(canvas.height)
        } else {
            canvas.height * IDLE_HEIGHT_FRACTION
        };
        let x = i as f32 * (bar_width + gap);
        let y = (canvas.height - height) / 2.0;
        commands.push(DrawCommand::RoundedRect {
            x,
            y,
            width: bar_width,
            height,
            radius: (bar_width / 2.0).min(height / 2.0),
        });
    }

    commands
}

/// Cancellable display-synchronized redraw loop.
///
/// Holds only read handles: the controller's status and tap. Stopping
/// playback does not kill the loop — it falls back to idle frames; `stop()`
/// (or drop) cancels the pending tick and joins the thread.
pub struct RenderLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RenderLoop {
    pub fn spawn<S: RenderSurface>(
        controller: Arc<PlaybackController>,
        mut surface: S,
        bar_count: usize,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("vocalis-render".into())
            .spawn(move || {
                let mut analyzer = SpectrumAnalyzer::new(controller.tap_handle(), bar_count);
                let idle = SpectrumFrame::idle(bar_count);

                while !stop_flag.load(Ordering::Acquire) {
                    let playing = controller.is_playing();
                    let commands = if playing {
                        let frame = analyzer.poll();
                        render_tick(&frame, true, surface.size())
                    } else {
                        render_tick(&idle, false, surface.size())
                    };
                    surface.submit(&commands);
                    thread::sleep(TICK);
                }
                debug!("render loop cancelled");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Cancel the loop and join. No frames are submitted after this returns.
    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::session::NullSink;
    use parking_lot::Mutex;

    #[test]
    fn tick_emits_clear_plus_one_rect_per_bar() {
        let frame = SpectrumFrame::idle(64);
        let commands = render_tick(&frame, true, DEFAULT_CANVAS);
        assert_eq!(commands.len(), 65);
        assert_eq!(commands[0], DrawCommand::Clear);
    }

    #[test]
    fn idle_bars_are_flat_and_low() {
        let frame = SpectrumFrame::idle(64);
        let commands = render_tick(&frame, false, DEFAULT_CANVAS);
        let expected_height = DEFAULT_CANVAS.height * IDLE_HEIGHT_FRACTION;
        for cmd in &commands[1..] {
            let DrawCommand::RoundedRect { height, y, .. } = cmd else {
                panic!("expected a bar, got {cmd:?}");
            };
            assert!((height - expected_height).abs() < 1e-6);
            // Centered vertically.
            assert!((y - (DEFAULT_CANVAS.height - expected_height) / 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn playing_zero_magnitude_collapses_bars() {
        let frame = SpectrumFrame::idle(64); // all zeros
        let commands = render_tick(&frame, true, DEFAULT_CANVAS);
        for cmd in &commands[1..] {
            let DrawCommand::RoundedRect { height, .. } = cmd else {
                panic!("expected a bar");
            };
            assert_eq!(*height, 0.0);
        }
    }

    #[test]
    fn bar_height_is_squared_magnitude_times_canvas_height() {
        let frame = SpectrumFrame::from_bars(vec![0.0, 0.5, 1.0]);
        let commands = render_tick(&frame, true, DEFAULT_CANVAS);
        let heights: Vec<f32> = commands[1..]
            .iter()
            .map(|cmd| match cmd {
                DrawCommand::RoundedRect { height, .. } => *height,
                other => panic!("expected a bar, got {other:?}"),
            })
            .collect();
        assert_eq!(heights[0], 0.0);
        assert!((heights[1] - 0.25 * DEFAULT_CANVAS.height).abs() < 1e-5);
        assert!((heights[2] - DEFAULT_CANVAS.height).abs() < 1e-5);
    }

    #[test]
    fn spacing_follows_the_bar_budget() {
        let frame = SpectrumFrame::idle(64);
        let commands = render_tick(&frame, true, DEFAULT_CANVAS);
        let expected_width = DEFAULT_CANVAS.width / (64.0 * 1.5);
        let DrawCommand::RoundedRect { x: x0, width, .. } = commands[1] else {
            panic!()
        };
        let DrawCommand::RoundedRect { x: x1, .. } = commands[2] else {
            panic!()
        };
        assert!((width - expected_width).abs() < 1e-4);
        assert_eq!(x0, 0.0);
        assert!((x1 - (expected_width * 1.5)).abs() < 1e-4);
    }

    #[test]
    fn loop_stops_submitting_after_cancel() {
        struct Recorder {
            frames: Arc<Mutex<usize>>,
        }
        impl RenderSurface for Recorder {
            fn size(&self) -> CanvasSize {
                DEFAULT_CANVAS
            }
            fn submit(&mut self, _commands: &[DrawCommand]) {
                *self.frames.lock() += 1;
            }
        }

        let controller = Arc::new(PlaybackController::new(Arc::new(NullSink::instant())));
        let frames = Arc::new(Mutex::new(0usize));
        let render = RenderLoop::spawn(
            Arc::clone(&controller),
            Recorder {
                frames: Arc::clone(&frames),
            },
            64,
        )
        .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while *frames.lock() == 0 {
            assert!(std::time::Instant::now() < deadline, "no frames rendered");
            thread::sleep(Duration::from_millis(2));
        }

        render.stop();
        let after_stop = *frames.lock();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(*frames.lock(), after_stop, "frames submitted after stop");
    }
}

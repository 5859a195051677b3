//! Structured events emitted by the pipeline.
//!
//! Two channels exist:
//!
//! | Event | Producer | Consumers |
//! |-------|----------|-----------|
//! | `PlaybackEvent` | playback worker | host UI state, render loop |
//! | `StudioEvent` | host command layer | rolling log, log sinks |
//!
//! `PlaybackEvent::Ended` is an explicit broadcast message — the host and
//! the renderer's cancellation logic both observe the same signal instead of
//! each capturing mutable state in completion callbacks.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Playback lifecycle events
// ---------------------------------------------------------------------------

/// Broadcast by the playback controller's worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum PlaybackEvent {
    /// A session opened its sink and audible output began.
    #[serde(rename_all = "camelCase")]
    Started { frames: usize, sample_rate: u32 },
    /// The session tore down.
    #[serde(rename_all = "camelCase")]
    Ended { reason: EndReason },
}

/// Why a playback session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// The buffer played through to its last frame.
    Completed,
    /// An explicit stop (or buffer replacement / profile switch).
    Stopped,
}

// ---------------------------------------------------------------------------
// Studio observability events
// ---------------------------------------------------------------------------

/// One loggable pipeline occurrence.
///
/// The host renders these as timestamped human-readable lines; the core only
/// guarantees the structured shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub kind: EventKind,
    /// Optional human-readable detail (byte counts, error text).
    pub detail: Option<String>,
}

/// Kind discriminant for `StudioEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A payload was decoded into a sample buffer.
    Decoded,
    /// A sample buffer was serialized into a container.
    Encoded,
    PlaybackStarted,
    PlaybackStopped,
    Error,
}

impl EventKind {
    /// Label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Decoded => "decoded",
            EventKind::Encoded => "encoded",
            EventKind::PlaybackStarted => "playback started",
            EventKind::PlaybackStopped => "playback stopped",
            EventKind::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_event_serializes_with_tag_and_camel_case() {
        let event = PlaybackEvent::Started {
            frames: 48_000,
            sample_rate: 24_000,
        };
        let json = serde_json::to_value(event).expect("serialize started event");
        assert_eq!(json["event"], "started");
        assert_eq!(json["frames"], 48_000);
        assert_eq!(json["sampleRate"], 24_000);

        let round_trip: PlaybackEvent =
            serde_json::from_value(json).expect("deserialize started event");
        assert_eq!(round_trip, event);
    }

    #[test]
    fn end_reason_serializes_lowercase() {
        let json = serde_json::to_value(PlaybackEvent::Ended {
            reason: EndReason::Completed,
        })
        .unwrap();
        assert_eq!(json["event"], "ended");
        assert_eq!(json["reason"], "completed");
    }

    #[test]
    fn studio_event_round_trips() {
        let event = StudioEvent {
            seq: 12,
            kind: EventKind::PlaybackStarted,
            detail: Some("2.0 s clip".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["seq"], 12);
        assert_eq!(json["kind"], "playbackstarted");
        assert_eq!(json["detail"], "2.0 s clip");

        let round_trip: StudioEvent = serde_json::from_value(json).unwrap();
        assert_eq!(round_trip.seq, 12);
        assert_eq!(round_trip.kind, EventKind::PlaybackStarted);
    }

    #[test]
    fn event_kind_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<EventKind>(r#""Decoded""#);
        assert!(err.is_err(), "expected non-lowercase kind to fail");
    }
}

//! Lock-free SPSC ring buffer backing the playback analysis tap.
//!
//! Uses `ringbuf::HeapRb<f32>` which provides a wait-free `push_slice`
//! safe to call from the real-time output callback. The tap is strictly
//! observational: if the consumer stops draining, pushes drop on the floor
//! and playback is unaffected.

pub mod buffer;

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Producer};

/// Type alias for the producer half — held by the sink callback.
pub type TapProducer = ringbuf::HeapProd<f32>;

/// Type alias for the consumer half — polled by the spectrum analyzer.
pub type TapConsumer = ringbuf::HeapCons<f32>;

/// Tap capacity: 2^16 = 65 536 mono samples ≈ 2.7 s at 24 kHz.
/// The analyzer only ever needs the most recent FFT window, so a stalled
/// consumer loses old samples, never playback.
pub const TAP_CAPACITY: usize = 1 << 16;

/// Create a matched producer/consumer pair backed by a heap-allocated ring.
///
/// # Panics
/// Never panics — `HeapRb` construction cannot fail for reasonable capacities.
pub fn create_analysis_tap() -> (TapProducer, TapConsumer) {
    HeapRb::<f32>::new(TAP_CAPACITY).split()
}

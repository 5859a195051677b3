//! End-to-end pipeline checks: synthesize → decode → play → analyze → export.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use vocalis_core::{
    decode, export, playback::session::NullSink, spectrum::SpectrumAnalyzer, wav, EncodedPayload,
    ExportFormat, PcmFormat, PlaybackController, PlayerStatus, SampleBuffer, StubSynthesizer,
    SpeechSynthesizer, SynthesisRequest, VocalisError,
};

fn wait_for(controller: &PlaybackController, status: PlayerStatus) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while controller.status() != status {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {status:?}"
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn stub_payload_flows_through_decode_play_and_export() {
    let mut synth = StubSynthesizer::new();
    let payload = synth
        .synthesize(&SynthesisRequest {
            prompt: "say: \"end to end\"".into(),
            voice_name: "Kore".into(),
        })
        .unwrap();

    let buffer = Arc::new(decode(&payload, PcmFormat::SERVICE).unwrap());
    assert_eq!(buffer.sample_rate(), 24_000);
    assert_eq!(buffer.channel_count(), 1);

    let controller = PlaybackController::new(Arc::new(NullSink::instant()));
    controller.load_buffer(Arc::clone(&buffer));
    controller.play().unwrap();
    wait_for(&controller, PlayerStatus::Loaded);

    let bytes = export(&buffer, ExportFormat::Wav).unwrap();
    assert_eq!(bytes.len(), wav::HEADER_LEN + buffer.frames() * 2);

    // The clip survives the session and can be exported again, identically.
    assert_eq!(bytes, export(&buffer, ExportFormat::Wav).unwrap());
}

#[test]
fn two_second_silent_payload_matches_reference_container() {
    // 2 s of zero samples at 24 kHz mono, base64 PCM16 like the service sends.
    let payload = EncodedPayload::new(BASE64.encode(vec![0u8; 96_000]));
    let buffer = decode(&payload, PcmFormat::SERVICE).unwrap();
    assert_eq!(buffer.frames(), 48_000);

    let bytes = export(&buffer, ExportFormat::Wav).unwrap();
    assert_eq!(bytes.len(), 44 + 96_000);
    assert_eq!(&bytes[22..24], &[0x01, 0x00], "channel count");
    assert_eq!(&bytes[24..28], &[0x00, 0x5D, 0x00, 0x00], "sample rate");
    assert_eq!(&bytes[34..36], &[0x10, 0x00], "bits per sample");
    assert!(bytes[44..].iter().all(|b| *b == 0), "silence stays silence");
}

#[test]
fn analyzer_observes_a_live_session() {
    // 1 s, 440 Hz, healthy amplitude.
    let samples: Vec<f32> = (0..24_000)
        .map(|i| (std::f32::consts::TAU * 440.0 * i as f32 / 24_000.0).sin() * 0.8)
        .collect();
    let buffer = Arc::new(SampleBuffer::from_channels(24_000, vec![samples]).unwrap());

    // Real-time pacing so the tap fills while we poll.
    let controller = PlaybackController::new(Arc::new(NullSink::new()));
    let mut analyzer = SpectrumAnalyzer::new(controller.tap_handle(), 64);

    controller.load_buffer(buffer);
    controller.play().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut lit = false;
    while controller.is_playing() && Instant::now() < deadline {
        let frame = analyzer.poll();
        if frame.bars().iter().any(|m| *m > 0.1) {
            lit = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    controller.stop();

    assert!(lit, "spectrum never lit up during playback");
}

#[test]
fn failed_decode_leaves_previous_buffer_playable() {
    let good = EncodedPayload::new(BASE64.encode(vec![0u8; 4_800]));
    let buffer = Arc::new(decode(&good, PcmFormat::SERVICE).unwrap());

    let controller = PlaybackController::new(Arc::new(NullSink::instant()));
    controller.load_buffer(Arc::clone(&buffer));

    // A bad generation attempt must not disturb the loaded clip.
    let bad = EncodedPayload::new(BASE64.encode(vec![0u8; 4_801]));
    assert!(matches!(
        decode(&bad, PcmFormat::SERVICE),
        Err(VocalisError::MalformedPayload(_))
    ));

    assert_eq!(controller.status(), PlayerStatus::Loaded);
    controller.play().unwrap();
    wait_for(&controller, PlayerStatus::Loaded);
}

#[test]
fn export_format_strings_cover_the_download_menu() {
    for (raw, ok) in [("wav", true), ("mp3", false), ("ogg", false)] {
        let format = ExportFormat::from_str(raw).unwrap();
        assert_eq!(format.is_encodable(), ok, "{raw}");
    }
}

//! Studio command layer.
//!
//! These are the operations the (out of scope) UI invokes: generation,
//! playback transport, export, profile management. Each command emits
//! structured events into the studio log. Invalid playback transitions are
//! caller bugs and are absorbed as no-ops, matching what the controls allow.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;
use vocalis_core::{
    audio::device::{list_output_devices, DeviceInfo},
    decode,
    error::{Result, VocalisError},
    events::EventKind,
    wav, ExportFormat, PcmFormat, SynthesisRequest,
};

use crate::profiles::{VoiceProfile, VoiceTuning};
use crate::prompt::construct_prompt;
use crate::state::Studio;

/// Summary of one successful generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub frames: usize,
    pub duration_secs: f64,
    pub wav_bytes: usize,
}

/// A downloadable artifact: filename plus container bytes.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Synthesize the script with the active profile, decode the payload, load
/// it for playback and keep WAV bytes ready for download.
///
/// Each attempt starts from a clean slate — the previous clip is released
/// before the service round trip, so a failed generation leaves the
/// transport controls disabled rather than half-loaded.
pub fn generate(studio: &Studio, script: &str) -> Result<GenerationOutcome> {
    let script = script.trim();
    if script.is_empty() {
        return Err(VocalisError::Other(anyhow::anyhow!("script is empty")));
    }

    let profile = studio
        .library
        .lock()
        .active()
        .cloned()
        .ok_or_else(|| VocalisError::Other(anyhow::anyhow!("no active voice profile")))?;
    let voice_name = studio.settings.lock().voice_name.clone();

    studio.controller.unload();
    *studio.last_wav.lock() = None;

    studio.note(format!("Generating audio for \"{}\"…", profile.name));

    let request = SynthesisRequest {
        prompt: construct_prompt(script, &profile),
        voice_name,
    };

    let payload = match studio.synthesizer.synthesize(&request) {
        Ok(payload) => payload,
        Err(e) => {
            studio.emit(EventKind::Error, Some(e.to_string()));
            return Err(e);
        }
    };
    if payload.is_empty() {
        let e = VocalisError::Transport("received empty audio data from the service".into());
        studio.emit(EventKind::Error, Some(e.to_string()));
        return Err(e);
    }

    studio.note("Audio data received. Decoding…");

    let buffer = match decode(&payload, PcmFormat::SERVICE) {
        Ok(buffer) => Arc::new(buffer),
        Err(e) => {
            studio.emit(EventKind::Error, Some(e.to_string()));
            return Err(e);
        }
    };

    studio.emit(
        EventKind::Decoded,
        Some(format!(
            "{} frames at {} Hz",
            buffer.frames(),
            buffer.sample_rate()
        )),
    );

    studio.controller.load_buffer(Arc::clone(&buffer));

    let wav_bytes = wav::encode(&buffer);
    studio.emit(
        EventKind::Encoded,
        Some(format!("{} bytes ready for download", wav_bytes.len())),
    );

    let outcome = GenerationOutcome {
        frames: buffer.frames(),
        duration_secs: buffer.duration_secs(),
        wav_bytes: wav_bytes.len(),
    };
    *studio.last_wav.lock() = Some(wav_bytes);

    studio.note("Audio generated successfully.");
    Ok(outcome)
}

/// Start playback of the loaded clip. A call with nothing loaded, or while
/// a session is already live, is absorbed as a no-op. Lifecycle logging
/// happens in the event forwarder, driven by the controller's broadcast.
pub fn play(studio: &Studio) -> Result<()> {
    match studio.controller.play() {
        Ok(()) => Ok(()),
        Err(e @ VocalisError::NoBufferLoaded) | Err(e @ VocalisError::SessionAlreadyActive) => {
            debug!("play ignored: {e}");
            Ok(())
        }
        Err(e) => {
            studio.emit(EventKind::Error, Some(e.to_string()));
            Err(e)
        }
    }
}

/// Stop playback. Idempotent; the UI's pause control maps here too (no
/// resume position is retained).
pub fn stop(studio: &Studio) {
    studio.controller.stop();
}

/// The play/pause button: stop when playing, start otherwise.
pub fn toggle_playback(studio: &Studio) -> Result<()> {
    if studio.controller.is_playing() {
        stop(studio);
        Ok(())
    } else {
        play(studio)
    }
}

/// Serialize the loaded clip for download.
///
/// # Errors
/// - `VocalisError::NoBufferLoaded` when nothing has been generated.
/// - `VocalisError::UnsupportedFormat` for formats without an encoder.
pub fn export(studio: &Studio, format: ExportFormat) -> Result<ExportArtifact> {
    let buffer = studio
        .controller
        .loaded_buffer()
        .ok_or(VocalisError::NoBufferLoaded)?;

    let bytes = match vocalis_core::export(&buffer, format) {
        Ok(bytes) => bytes,
        Err(e) => {
            studio.emit(EventKind::Error, Some(e.to_string()));
            return Err(e);
        }
    };

    let profile_name = studio
        .library
        .lock()
        .active()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "voice".into());
    let filename = export_filename(&profile_name, Utc::now().date_naive(), format);

    studio.emit(
        EventKind::Encoded,
        Some(format!("{} bytes → {filename}", bytes.len())),
    );

    Ok(ExportArtifact { filename, bytes })
}

/// `{profile name, whitespace → underscores}_{ISO date}.{extension}`
pub fn export_filename(profile_name: &str, date: NaiveDate, format: ExportFormat) -> String {
    let stripped: String = profile_name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{stripped}_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// Make a profile active. Forces an immediate stop and buffer release so no
/// audio from the previous voice survives the switch.
pub fn select_profile(studio: &Studio, id: &str) -> Result<()> {
    let name = {
        let mut library = studio.library.lock();
        if !library.select(id) {
            return Err(VocalisError::Other(anyhow::anyhow!(
                "unknown profile: {id}"
            )));
        }
        library.active().map(|p| p.name.clone()).unwrap_or_default()
    };

    release_stale_audio(studio);
    studio.note(format!("Switched to voice profile: {name}"));
    Ok(())
}

/// Create a new profile and select it (releasing any loaded audio, like any
/// other selection change).
pub fn create_profile(studio: &Studio) -> VoiceProfile {
    let profile = studio.library.lock().create();
    release_stale_audio(studio);
    studio.note(format!("Created new voice profile: {}", profile.name));
    profile
}

/// Delete a profile. Deleting the active one releases loaded audio and
/// falls back to the first remaining profile.
pub fn delete_profile(studio: &Studio, id: &str) -> bool {
    let (removed, was_active) = {
        let mut library = studio.library.lock();
        let was_active = library.active().map(|p| p.id == id).unwrap_or(false);
        (library.delete(id), was_active)
    };

    if removed {
        if was_active {
            release_stale_audio(studio);
        }
        studio.note("Deleted voice profile.");
    }
    removed
}

pub fn rename_profile(studio: &Studio, id: &str, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    studio
        .library
        .lock()
        .update(id, |p| p.name = name.to_string())
}

pub fn update_tuning<F: FnOnce(&mut VoiceTuning)>(studio: &Studio, id: &str, edit: F) -> bool {
    studio.library.lock().update(id, |p| edit(&mut p.settings))
}

pub fn search_profiles(studio: &Studio, query: &str) -> Vec<VoiceProfile> {
    studio
        .library
        .lock()
        .search(query)
        .into_iter()
        .cloned()
        .collect()
}

/// Available audio output devices.
pub fn list_devices() -> Vec<DeviceInfo> {
    list_output_devices()
}

/// Stop, release the loaded clip and drop the download bytes, so nothing
/// from the previous voice context survives.
fn release_stale_audio(studio: &Studio) {
    studio.controller.unload();
    *studio.last_wav.lock() = None;
}

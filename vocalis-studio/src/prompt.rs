//! Prompt-text construction for the generation model.
//!
//! The TTS endpoint exposes no direct controls for most of the studio's
//! tuning sliders, so the settings are folded into the prompt as spoken
//! direction. Only values past their thresholds contribute a phrase.

use crate::profiles::VoiceProfile;

/// Build the full prompt sent to the generation service.
pub fn construct_prompt(script: &str, profile: &VoiceProfile) -> String {
    let tuning = &profile.settings;
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("In the voice of {},", profile.description));
    parts.push(format!(
        "speaking in a {} style,",
        profile.vibe.to_lowercase()
    ));

    if tuning.speed < 0.9 {
        parts.push("speaking slowly".into());
    }
    if tuning.speed > 1.1 {
        parts.push("speaking quickly".into());
    }
    if tuning.pitch < 0.9 {
        parts.push("with a low pitch".into());
    }
    if tuning.pitch > 1.1 {
        parts.push("with a high pitch".into());
    }
    if tuning.emotional_depth > 0.7 {
        parts.push("with deep emotion".into());
    }
    if tuning.clarity > 0.8 {
        parts.push("with clear articulation".into());
    }
    if tuning.breathing_level > 0.5 {
        parts.push("with audible breathing".into());
    }

    parts.push(format!("say: \"{script}\""));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{VoiceLibrary, VoiceTuning};

    fn neutral_profile() -> VoiceProfile {
        VoiceProfile {
            id: "vp_t".into(),
            name: "Test".into(),
            description: "a test voice".into(),
            vibe: "Calm".into(),
            settings: VoiceTuning::default(),
        }
    }

    #[test]
    fn neutral_settings_add_no_modifiers() {
        let prompt = construct_prompt("hello", &neutral_profile());
        assert_eq!(
            prompt,
            "In the voice of a test voice, speaking in a calm style, say: \"hello\""
        );
    }

    #[test]
    fn threshold_crossings_add_their_phrases() {
        let mut profile = neutral_profile();
        profile.settings.speed = 0.8;
        profile.settings.pitch = 1.2;
        profile.settings.emotional_depth = 0.9;
        profile.settings.clarity = 0.95;
        profile.settings.breathing_level = 0.6;

        let prompt = construct_prompt("hi", &profile);
        assert!(prompt.contains("speaking slowly"));
        assert!(prompt.contains("with a high pitch"));
        assert!(prompt.contains("with deep emotion"));
        assert!(prompt.contains("with clear articulation"));
        assert!(prompt.contains("with audible breathing"));
        assert!(prompt.ends_with("say: \"hi\""));
    }

    #[test]
    fn boundary_values_do_not_trigger_modifiers() {
        let mut profile = neutral_profile();
        profile.settings.speed = 0.9;
        profile.settings.pitch = 1.1;
        profile.settings.emotional_depth = 0.7;
        profile.settings.clarity = 0.8;
        profile.settings.breathing_level = 0.5;

        let prompt = construct_prompt("hi", &profile);
        assert!(!prompt.contains("slowly"));
        assert!(!prompt.contains("pitch"));
        assert!(!prompt.contains("emotion"));
        assert!(!prompt.contains("articulation"));
        assert!(!prompt.contains("breathing"));
    }

    #[test]
    fn seeded_narrator_reads_like_documentary_direction() {
        let library = VoiceLibrary::seeded();
        let prompt = construct_prompt("The ocean is vast.", library.active().unwrap());
        assert!(prompt.starts_with(
            "In the voice of A clear, deep male voice for documentary narration.,"
        ));
        assert!(prompt.contains("speaking in a documentary style,"));
        assert!(prompt.contains("with deep emotion"));
        assert!(prompt.contains("with clear articulation"));
    }
}

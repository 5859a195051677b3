//! Voice profile library: the studio's collection of configured voices.

use serde::{Deserialize, Serialize};

/// Per-voice generation parameters. Values outside the documented ranges are
/// tolerated; prompt construction only applies thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct VoiceTuning {
    pub language: String,
    pub speed: f32,
    pub pitch: f32,
    pub temperature: f32,
    pub emotional_depth: f32,
    pub clarity: f32,
    pub breathing_level: f32,
    pub stability: f32,
    pub accent: String,
}

impl Default for VoiceTuning {
    fn default() -> Self {
        Self {
            language: "EN".into(),
            speed: 1.0,
            pitch: 1.0,
            temperature: 0.5,
            emotional_depth: 0.5,
            clarity: 0.75,
            breathing_level: 0.1,
            stability: 0.75,
            accent: "None".into(),
        }
    }
}

/// One configured voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Overall delivery style ("Documentary", "Friendly", …).
    pub vibe: String,
    pub settings: VoiceTuning,
}

/// In-memory profile collection with a single active selection.
#[derive(Debug, Clone)]
pub struct VoiceLibrary {
    profiles: Vec<VoiceProfile>,
    active_id: Option<String>,
    next_id: u64,
}

impl VoiceLibrary {
    /// Empty library, nothing selected.
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
            active_id: None,
            next_id: 1,
        }
    }

    /// Library seeded with the default narrator voice, selected.
    pub fn seeded() -> Self {
        let mut library = Self::new();
        let id = library.allocate_id();
        library.profiles.push(VoiceProfile {
            id: id.clone(),
            name: "Narrator".into(),
            description: "A clear, deep male voice for documentary narration.".into(),
            vibe: "Documentary".into(),
            settings: VoiceTuning {
                temperature: 0.7,
                emotional_depth: 0.8,
                clarity: 0.9,
                breathing_level: 0.2,
                stability: 0.8,
                accent: "American".into(),
                ..VoiceTuning::default()
            },
        });
        library.active_id = Some(id);
        library
    }

    fn allocate_id(&mut self) -> String {
        let id = format!("vp_{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a fresh profile with default tuning and select it.
    pub fn create(&mut self) -> VoiceProfile {
        let id = self.allocate_id();
        let profile = VoiceProfile {
            id: id.clone(),
            name: format!("New Voice {}", self.profiles.len() + 1),
            description: "A new custom voice.".into(),
            vibe: "Friendly".into(),
            settings: VoiceTuning::default(),
        };
        self.profiles.push(profile.clone());
        self.active_id = Some(id);
        profile
    }

    pub fn active(&self) -> Option<&VoiceProfile> {
        let id = self.active_id.as_deref()?;
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&VoiceProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Select a profile by id. Returns false for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if self.profiles.iter().any(|p| p.id == id) {
            self.active_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Apply an edit to one profile. Returns false for unknown ids.
    pub fn update<F: FnOnce(&mut VoiceProfile)>(&mut self, id: &str, edit: F) -> bool {
        match self.profiles.iter_mut().find(|p| p.id == id) {
            Some(profile) => {
                edit(profile);
                true
            }
            None => false,
        }
    }

    /// Delete a profile. A deleted active selection falls back to the first
    /// remaining profile (or nothing).
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        let removed = self.profiles.len() != before;

        if removed && self.active_id.as_deref() == Some(id) {
            self.active_id = self.profiles.first().map(|p| p.id.clone());
        }
        removed
    }

    /// Case-insensitive search over names and descriptions.
    pub fn search(&self, query: &str) -> Vec<&VoiceProfile> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.profiles.iter().collect();
        }
        self.profiles
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for VoiceLibrary {
    fn default() -> Self {
        Self::seeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_library_has_an_active_narrator() {
        let library = VoiceLibrary::seeded();
        let active = library.active().expect("seeded profile selected");
        assert_eq!(active.name, "Narrator");
        assert_eq!(active.vibe, "Documentary");
    }

    #[test]
    fn create_selects_the_new_profile() {
        let mut library = VoiceLibrary::seeded();
        let created = library.create();
        assert_eq!(library.active().unwrap().id, created.id);
        assert_eq!(created.name, "New Voice 2");
    }

    #[test]
    fn deleting_the_active_profile_falls_back_to_first() {
        let mut library = VoiceLibrary::seeded();
        let second = library.create();
        assert!(library.delete(&second.id));
        assert_eq!(library.active().unwrap().name, "Narrator");
    }

    #[test]
    fn deleting_the_last_profile_clears_the_selection() {
        let mut library = VoiceLibrary::seeded();
        let id = library.active().unwrap().id.clone();
        assert!(library.delete(&id));
        assert!(library.active().is_none());
        assert!(library.is_empty());
    }

    #[test]
    fn update_edits_in_place() {
        let mut library = VoiceLibrary::seeded();
        let id = library.active().unwrap().id.clone();
        assert!(library.update(&id, |p| p.name = "Storyteller".into()));
        assert_eq!(library.active().unwrap().name, "Storyteller");
        assert!(!library.update("vp_404", |p| p.name = "nope".into()));
    }

    #[test]
    fn search_matches_name_and_description() {
        let mut library = VoiceLibrary::seeded();
        library.create();
        assert_eq!(library.search("narra").len(), 1);
        assert_eq!(library.search("custom").len(), 1);
        assert_eq!(library.search("").len(), 2);
    }

    #[test]
    fn profile_serializes_camel_case() {
        let library = VoiceLibrary::seeded();
        let json = serde_json::to_value(library.active().unwrap()).unwrap();
        assert_eq!(json["settings"]["emotionalDepth"], 0.8f32);
        assert_eq!(json["settings"]["breathingLevel"], 0.2f32);
    }
}

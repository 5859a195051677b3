//! Persistent studio settings (JSON file in the platform data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_VOICE: &str = "Kore";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct StudioSettings {
    /// API key for the remote generation service. `GEMINI_API_KEY` in the
    /// environment takes precedence.
    pub gemini_api_key: Option<String>,
    pub model: String,
    /// Prebuilt voice the service renders with.
    pub voice_name: String,
    pub preferred_output_device: Option<String>,
    pub spectrum_bars: usize,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.into(),
            voice_name: DEFAULT_VOICE.into(),
            preferred_output_device: None,
            spectrum_bars: 64,
            canvas_width: 600.0,
            canvas_height: 96.0,
        }
    }
}

impl StudioSettings {
    pub fn normalize(&mut self) {
        self.gemini_api_key = self
            .gemini_api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if self.model.trim().is_empty() {
            self.model = DEFAULT_MODEL.into();
        }
        if self.voice_name.trim().is_empty() {
            self.voice_name = DEFAULT_VOICE.into();
        }
        self.preferred_output_device = self
            .preferred_output_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.spectrum_bars = self.spectrum_bars.clamp(8, 256);
        self.canvas_width = self.canvas_width.clamp(100.0, 4096.0);
        self.canvas_height = self.canvas_height.clamp(16.0, 1024.0);
    }

    /// Environment key wins over the persisted one.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| self.gemini_api_key.clone())
    }
}

pub fn default_settings_path() -> PathBuf {
    if let Some(path) = std::env::var_os("VOCALIS_SETTINGS") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Vocalis")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("vocalis")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> StudioSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<StudioSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &StudioSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

//! Export dispatch: sample buffer + target format → downloadable bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::wav;
use crate::buffering::buffer::SampleBuffer;
use crate::error::{Result, VocalisError};

/// Closed set of export targets.
///
/// Only `Wav` has an encoder. `Mp3` and `Ogg` are kept in the enum so the
/// capability gap is explicit at the type level; requesting them fails fast
/// with `UnsupportedFormat` instead of shipping mislabeled WAV bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Wav,
    Mp3,
    Ogg,
}

impl ExportFormat {
    /// File extension for the outbound artifact.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Wav => "wav",
            ExportFormat::Mp3 => "mp3",
            ExportFormat::Ogg => "ogg",
        }
    }

    /// Whether an encoder exists for this format.
    pub fn is_encodable(self) -> bool {
        matches!(self, ExportFormat::Wav)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = VocalisError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(ExportFormat::Wav),
            "mp3" => Ok(ExportFormat::Mp3),
            "ogg" => Ok(ExportFormat::Ogg),
            other => Err(VocalisError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Serialize `buffer` for download in the requested format.
///
/// # Errors
/// `VocalisError::UnsupportedFormat` for formats without an encoder.
pub fn export(buffer: &SampleBuffer, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Wav => Ok(wav::encode(buffer)),
        ExportFormat::Mp3 | ExportFormat::Ogg => {
            Err(VocalisError::UnsupportedFormat(format.extension().into()))
        }
    }
}

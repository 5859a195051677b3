use thiserror::Error;

/// All errors produced by vocalis-core.
#[derive(Debug, Error)]
pub enum VocalisError {
    /// The generation service returned no payload, or the transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The generation service refused the request on safety grounds.
    /// Surfaced to the user distinctly from generic transport failures.
    #[error("generation blocked by safety filter: {0}")]
    SafetyRejected(String),

    #[error("malformed audio payload: {0}")]
    MalformedPayload(String),

    #[error("{samples} samples cannot be split into {channels} channels")]
    ChannelMismatch { samples: usize, channels: u16 },

    #[error("no encoder for export format '{0}'")]
    UnsupportedFormat(String),

    #[error("no sample buffer loaded")]
    NoBufferLoaded,

    #[error("a playback session is already active")]
    SessionAlreadyActive,

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VocalisError>;

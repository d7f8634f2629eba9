use crate::media::TransportErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback start rejected: {reason}")]
    PlayRejected { reason: String },

    #[error("transport error ({kind}, fatal={fatal}): {details}")]
    Transport {
        kind: TransportErrorKind,
        fatal: bool,
        details: String,
    },

    #[error("media element error: {message}")]
    Media { message: String },

    #[error("catalog error: {reason}")]
    Catalog { reason: String },

    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("player has shut down")]
    Cancelled,
}

impl PlaybackError {
    pub fn play_rejected(reason: impl Into<String>) -> Self {
        Self::PlayRejected {
            reason: reason.into(),
        }
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self::Media {
            message: message.into(),
        }
    }

    pub fn catalog(reason: impl Into<String>) -> Self {
        Self::Catalog {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Whether the failure should go through the bounded reconnect cycle.
    ///
    /// Raw media element errors count as retryable: the element does not say
    /// whether a network or a decoder failure caused them.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { kind, fatal, .. } => *fatal && *kind == TransportErrorKind::Network,
            Self::Media { .. } => true,
            Self::PlayRejected { .. }
            | Self::Catalog { .. }
            | Self::Config { .. }
            | Self::Io { .. }
            | Self::Json { .. }
            | Self::Cancelled => false,
        }
    }
}

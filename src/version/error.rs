use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Cancelled while waiting for a concurrency slot; no request was sent
    #[error("request cancelled before it was sent")]
    AdmissionCancelled,

    #[error("fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportCause,
    },

    #[error("proxy returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl RegistryError {
    /// True when the caller's cancellation token ended the call
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RegistryError::AdmissionCancelled
                | RegistryError::Transport {
                    source: TransportCause::Cancelled,
                    ..
                }
        )
    }

    /// HTTP status of an upstream rejection
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportCause {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,
}

use thiserror::Error;

/// Failures the harvester distinguishes between.
///
/// Only [`HarvestError::Config`] aborts a run; the others are contained to
/// the page they happened on.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("request failed: {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog returned HTTP {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("unexpected page structure at {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HarvestError {
    pub fn parse(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

use serde::Serialize;
use std::fmt;

/// Lifecycle state of a [`DemuxSession`](super::DemuxSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    /// Header discovery in progress.
    Opening,
    Stopped,
    Started,
    Paused,
    /// Terminal.
    Shutdown,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Opening => "opening",
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Shutdown => "shut down",
        };
        f.write_str(name)
    }
}

/// Delivery state of one track stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    #[default]
    Stopped,
    Started,
    Paused,
}

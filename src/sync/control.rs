//! Control-channel signals from the hosting page.

use super::Synchronizer;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::stats::BatchStats;
use crate::store::CacheStore;

/// Signals accepted from the hosting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Take over immediately instead of waiting for older clients to close.
    SkipWaiting,
    /// Fetch every manifest resource missing from the live cache.
    DownloadOffline,
}

impl ControlMessage {
    /// Parses a raw signal. Unknown signals yield `None`.
    #[must_use]
    pub fn parse(signal: &str) -> Option<Self> {
        match signal {
            "skipWaiting" => Some(Self::SkipWaiting),
            "downloadOffline" => Some(Self::DownloadOffline),
            _ => None,
        }
    }

    /// The wire form of the signal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SkipWaiting => "skipWaiting",
            Self::DownloadOffline => "downloadOffline",
        }
    }
}

impl<S: CacheStore, F: Fetcher> Synchronizer<S, F> {
    /// Dispatches a control-channel signal.
    ///
    /// Returns the batch statistics for `downloadOffline`, `None` otherwise.
    /// Unrecognized signals are ignored.
    ///
    /// # Errors
    ///
    /// Propagates offline download failures.
    pub async fn handle_message(&self, signal: &str) -> Result<Option<BatchStats>> {
        match ControlMessage::parse(signal) {
            Some(ControlMessage::SkipWaiting) => {
                self.lifecycle().request_skip_waiting();
                log::info!("Skip-waiting requested");
                Ok(None)
            }
            Some(ControlMessage::DownloadOffline) => self.download_offline().await.map(Some),
            None => {
                log::debug!("Ignoring unknown control message {signal:?}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_signals() {
        assert_eq!(
            ControlMessage::parse("skipWaiting"),
            Some(ControlMessage::SkipWaiting)
        );
        assert_eq!(
            ControlMessage::parse("downloadOffline"),
            Some(ControlMessage::DownloadOffline)
        );
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!(ControlMessage::parse("SKIPWAITING"), None);
        assert_eq!(ControlMessage::parse(" downloadOffline"), None);
        assert_eq!(ControlMessage::parse(""), None);
    }

    #[test]
    fn wire_form_round_trips() {
        for msg in [ControlMessage::SkipWaiting, ControlMessage::DownloadOffline] {
            assert_eq!(ControlMessage::parse(msg.as_str()), Some(msg));
        }
    }
}

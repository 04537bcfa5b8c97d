use async_trait::async_trait;
use symphonia::core::io::MediaSource;
use tokio_util::sync::CancellationToken;

use super::events::EventSender;
use crate::{error::MusicError, sources::Locator};

/// Byte stream ready to be attached to a voice sink.
pub struct TrackStream {
    pub locator: Locator,
    pub source: Box<dyn MediaSource>,
}

impl std::fmt::Debug for TrackStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackStream")
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

/// Kill switch for a running extraction process.
///
/// `kill` may be called any number of times, before or after the process
/// exits on its own.
#[derive(Debug, Clone)]
pub struct ExtractorHandle {
    cancel: CancellationToken,
}

impl ExtractorHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn kill(&self) {
        self.cancel.cancel();
    }
}

/// Stream plus the process producing it.
pub struct ExtractedStream {
    pub stream: TrackStream,
    pub process: ExtractorHandle,
}

/// Spawns the external extraction for a locator.
///
/// The provider reports the process exit to the session through `events`,
/// tagged with `generation`.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    async fn open(
        &self,
        locator: &Locator,
        generation: u64,
        events: EventSender,
    ) -> Result<ExtractedStream, MusicError>;
}

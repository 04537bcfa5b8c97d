//! Error taxonomy for music operations.
//!
//! Every variant is terminal for the operation that raised it: handlers log
//! the error and answer the invoking surface with [`MusicError::user_message`].
//! Nothing here is retried automatically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicError {
    /// El usuario no está en un canal de voz
    #[error("user is not connected to a voice channel")]
    NoVoiceChannel,

    /// Botón pulsado desde fuera del canal de voz del bot
    #[error("user does not share the bot's voice channel")]
    NotAuthorized,

    #[error("search returned no results")]
    NotFound,

    #[error("audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("playback failed: {0}")]
    PlaybackError(String),

    #[error("missing send/embed permissions in the text channel")]
    PermissionDenied,

    #[error("queue is empty")]
    EmptyQueue,

    #[error("nothing is playing")]
    NothingPlaying,

    #[error("bot is not connected to a voice channel")]
    NotConnected,

    #[error("playback is already paused")]
    AlreadyPaused,

    #[error("playback is already running")]
    AlreadyPlaying,

    #[error("no query was provided")]
    MissingQuery,

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("search failed: {0}")]
    Search(String),

    #[error("voice connection failed: {0}")]
    Voice(String),

    #[error("guild session is no longer running")]
    SessionClosed,
}

impl MusicError {
    /// Texto fijo que ve el usuario en Discord
    pub fn user_message(&self) -> &'static str {
        match self {
            MusicError::NoVoiceChannel => "❌ You need to join a voice channel first!",
            MusicError::NotAuthorized => {
                "❌ You need to be in the same voice channel as me to use these buttons!"
            }
            MusicError::NotFound => "❌ No songs found!",
            MusicError::ExtractionFailed(_) => "❌ Failed to play audio.",
            MusicError::PlaybackError(_) => "❌ Error playing audio.",
            MusicError::PermissionDenied => {
                "❌ I don't have permission to send messages or embed links here!"
            }
            MusicError::EmptyQueue => "❌ The queue is empty!",
            MusicError::NothingPlaying => "❌ Nothing is playing!",
            MusicError::NotConnected => "❌ I'm not in a voice channel!",
            MusicError::AlreadyPaused => "⏸️ Already paused!",
            MusicError::AlreadyPlaying => "▶️ Already playing!",
            MusicError::MissingQuery => "❌ You need to provide a YouTube link or song name!",
            MusicError::Timeout(_)
            | MusicError::Search(_)
            | MusicError::Voice(_)
            | MusicError::SessionClosed => "❌ Something went wrong, please try again later.",
        }
    }

    /// Rechazos que no merecen un mensaje público en el canal
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MusicError::NotAuthorized
                | MusicError::NotConnected
                | MusicError::NothingPlaying
                | MusicError::AlreadyPaused
                | MusicError::AlreadyPlaying
                | MusicError::EmptyQueue
        )
    }
}

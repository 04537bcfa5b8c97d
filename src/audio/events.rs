use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{tracks::PlayMode, Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::session::SessionMessage;

/// Notifications delivered to a guild session.
///
/// Track and extractor notifications carry the generation of the attach
/// they belong to; the session drops any whose generation is not the one
/// currently playing. Voice updates carry the instant the gateway update was
/// seen, so updates older than the current connection are dropped too.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// El sink terminó el track (fin natural o `stop`)
    TrackEnded { generation: u64 },
    /// El sink reportó un error reproduciendo el track
    TrackFailed { generation: u64, reason: String },
    /// El proceso de extracción terminó
    ExtractorExited {
        generation: u64,
        success: bool,
        code: Option<i32>,
        killed: bool,
    },
    /// El bot quedó sin canal de voz
    VoiceDisconnected { seen_at: Instant },
    /// Alguien movió al bot a otro canal de voz
    VoiceMoved { channel: ChannelId, seen_at: Instant },
}

/// Cloneable handle used by sinks and processes to reach their session.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: SessionEvent) {
        if self.tx.send(SessionMessage::Event(event)).is_err() {
            debug!("Sesión cerrada, evento descartado");
        }
    }
}

/// Handler para cuando termina un track
pub struct TrackEndNotifier {
    pub guild_id: GuildId,
    pub generation: u64,
    pub events: EventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        debug!(
            "🎵 Track {} terminó en guild {}",
            self.generation, self.guild_id
        );
        self.events.send(SessionEvent::TrackEnded {
            generation: self.generation,
        });
        None
    }
}

/// Handler para errores de tracks
pub struct TrackErrorNotifier {
    pub guild_id: GuildId,
    pub generation: u64,
    pub events: EventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let mut reason = String::from("unknown playback error");

        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                if let PlayMode::Errored(e) = &state.playing {
                    reason = format!("{:?}", e);
                }
            }
        }

        error!(
            "❌ Error en track {} para guild {}: {}",
            self.generation, self.guild_id, reason
        );
        self.events.send(SessionEvent::TrackFailed {
            generation: self.generation,
            reason,
        });
        None
    }
}

use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::debug;

use super::{
    session::{SessionDeps, SessionHandle, SessionNotifier, SessionSettings},
    stream::StreamProvider,
    voice::VoiceConnector,
};

/// Registro de sesiones por guild
pub struct AudioPlayer {
    sessions: DashMap<GuildId, SessionHandle>,
    connector: Arc<dyn VoiceConnector>,
    streams: Arc<dyn StreamProvider>,
    settings: SessionSettings,
}

impl AudioPlayer {
    pub fn new(
        connector: Arc<dyn VoiceConnector>,
        streams: Arc<dyn StreamProvider>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            connector,
            streams,
            settings,
        }
    }

    /// Devuelve la sesión de la guild, creándola si no existe.
    ///
    /// `notifier` is only kept when a new actor has to be spawned; an
    /// existing session keeps announcing through the one it was created with.
    pub fn session(&self, guild_id: GuildId, notifier: Arc<dyn SessionNotifier>) -> SessionHandle {
        let mut entry = self.sessions.entry(guild_id).or_insert_with(|| {
            debug!("🆕 Creando sesión para guild {}", guild_id);
            SessionHandle::spawn(guild_id, self.deps(Arc::clone(&notifier)))
        });

        if entry.is_closed() {
            debug!("♻️ Sesión cerrada para guild {}, se reemplaza", guild_id);
            *entry = SessionHandle::spawn(guild_id, self.deps(notifier));
        }

        entry.clone()
    }

    /// Sesión existente, si la hay
    pub fn existing(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.sessions
            .get(&guild_id)
            .map(|entry| entry.clone())
            .filter(|handle| !handle.is_closed())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn deps(&self, notifier: Arc<dyn SessionNotifier>) -> SessionDeps {
        SessionDeps {
            connector: Arc::clone(&self.connector),
            streams: Arc::clone(&self.streams),
            notifier,
            settings: self.settings,
        }
    }
}

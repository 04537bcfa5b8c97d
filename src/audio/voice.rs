use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{AudioStream, Input, LiveInput},
    tracks::TrackHandle,
    Call, Event, Songbird, TrackEvent,
};
use std::sync::Arc;
use symphonia::core::probe::Hint;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    events::{EventSender, TrackEndNotifier, TrackErrorNotifier},
    stream::TrackStream,
};
use crate::error::MusicError;

/// Voice transport seam: joins a channel and hands back a sink.
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        events: EventSender,
    ) -> Result<Box<dyn VoiceSink>, MusicError>;
}

/// One voice connection and the single track playing on it.
#[async_trait]
pub trait VoiceSink: Send {
    fn channel_id(&self) -> ChannelId;

    /// Records that the bot now sits in `channel_id`.
    fn moved_to(&mut self, channel_id: ChannelId);

    /// Starts `stream`; end and error notifications carry `generation`.
    async fn attach(&mut self, stream: TrackStream, generation: u64) -> Result<(), MusicError>;

    fn pause(&mut self) -> Result<(), MusicError>;

    fn resume(&mut self) -> Result<(), MusicError>;

    fn stop_current(&mut self);

    /// Leaves the channel; the sink is unusable afterwards.
    async fn destroy(&mut self);
}

/// Conector basado en el manager de songbird
pub struct SongbirdConnector {
    manager: Arc<Songbird>,
    volume: f32,
}

impl SongbirdConnector {
    pub fn new(manager: Arc<Songbird>, volume: f32) -> Self {
        Self { manager, volume }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        events: EventSender,
    ) -> Result<Box<dyn VoiceSink>, MusicError> {
        info!("🔊 Uniéndose al canal {} en guild {}", channel_id, guild_id);

        let call = match self.manager.join(guild_id, channel_id).await {
            Ok(call) => call,
            Err(e) => {
                // join deja la llamada registrada aunque falle
                if let Err(remove_err) = self.manager.remove(guild_id).await {
                    debug!("No había llamada que limpiar: {:?}", remove_err);
                }
                return Err(MusicError::Voice(e.to_string()));
            }
        };

        Ok(Box::new(SongbirdSink {
            manager: Arc::clone(&self.manager),
            guild_id,
            channel_id,
            call,
            current: None,
            volume: self.volume,
            events,
        }))
    }
}

pub struct SongbirdSink {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    channel_id: ChannelId,
    call: Arc<Mutex<Call>>,
    current: Option<TrackHandle>,
    volume: f32,
    events: EventSender,
}

impl SongbirdSink {
    fn current(&self) -> Result<&TrackHandle, MusicError> {
        self.current.as_ref().ok_or(MusicError::NothingPlaying)
    }
}

#[async_trait]
impl VoiceSink for SongbirdSink {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn moved_to(&mut self, channel_id: ChannelId) {
        self.channel_id = channel_id;
    }

    async fn attach(&mut self, stream: TrackStream, generation: u64) -> Result<(), MusicError> {
        let input = Input::Live(
            LiveInput::Raw(AudioStream {
                input: stream.source,
                hint: Some(Hint::new()),
            }),
            None,
        );

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        if let Err(e) = handle.set_volume(self.volume) {
            warn!("⚠️ No se pudo ajustar el volumen: {:?}", e);
        }

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    guild_id: self.guild_id,
                    generation,
                    events: self.events.clone(),
                },
            )
            .map_err(|e| MusicError::PlaybackError(format!("end handler: {:?}", e)))?;

        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorNotifier {
                    guild_id: self.guild_id,
                    generation,
                    events: self.events.clone(),
                },
            )
            .map_err(|e| MusicError::PlaybackError(format!("error handler: {:?}", e)))?;

        debug!("▶️ Track {} conectado al canal {}", generation, self.channel_id);
        self.current = Some(handle);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), MusicError> {
        self.current()?
            .pause()
            .map_err(|e| MusicError::PlaybackError(format!("{:?}", e)))
    }

    fn resume(&mut self) -> Result<(), MusicError> {
        self.current()?
            .play()
            .map_err(|e| MusicError::PlaybackError(format!("{:?}", e)))
    }

    fn stop_current(&mut self) {
        if let Some(handle) = self.current.take() {
            // Puede fallar si el track ya terminó
            let _ = handle.stop();
        }
    }

    async fn destroy(&mut self) {
        self.stop_current();
        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("⚠️ Error al salir del canal de voz: {:?}", e);
        }
        info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
    }
}

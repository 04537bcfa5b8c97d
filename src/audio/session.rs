use serenity::model::id::{ChannelId, GuildId};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tracing::{debug, info, warn};

use super::{
    events::{EventSender, SessionEvent},
    queue::{MusicQueue, QueueItem},
    stream::{ExtractorHandle, StreamProvider},
    voice::{VoiceConnector, VoiceSink},
};
use crate::error::MusicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Advancing,
    Playing,
    Paused,
    Terminating,
}

type Reply<T> = oneshot::Sender<Result<T, MusicError>>;

#[derive(Debug)]
pub enum SessionCommand {
    Enqueue {
        item: QueueItem,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        reply: Reply<EnqueueOutcome>,
    },
    Skip { reply: Reply<()> },
    Pause { reply: Reply<()> },
    Resume { reply: Reply<()> },
    Stop { reply: Reply<()> },
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
}

/// Everything the session actor consumes, in arrival order.
#[derive(Debug)]
pub enum SessionMessage {
    Command(SessionCommand),
    Event(SessionEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// El track empezó a sonar de inmediato
    Started,
    /// Posición en la cola, empezando en 1
    Queued { position: usize },
}

/// Read-only view of a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub current: Option<QueueItem>,
    pub upcoming: Vec<QueueItem>,
    pub voice_channel: Option<ChannelId>,
    pub playing_generation: Option<u64>,
}

/// Outbound announcements from a session to its text channel.
///
/// Implementations must not block: the actor calls these inline.
pub trait SessionNotifier: Send + Sync {
    fn now_playing(&self, text_channel: ChannelId, item: &QueueItem);

    fn report(&self, text_channel: ChannelId, error: &MusicError);

    fn queue_drained(&self, text_channel: ChannelId);
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub join_timeout: Duration,
    pub open_timeout: Duration,
}

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionDeps {
    pub connector: Arc<dyn VoiceConnector>,
    pub streams: Arc<dyn StreamProvider>,
    pub notifier: Arc<dyn SessionNotifier>,
    pub settings: SessionSettings,
}

/// Cloneable front door to a guild's session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    /// Spawns the actor for `guild_id` on the current runtime.
    pub fn spawn(guild_id: GuildId, deps: SessionDeps) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = GuildSession::new(guild_id, deps, EventSender::new(tx.clone()));
        tokio::spawn(session.run(rx));
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, MusicError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMessage::Command(build(reply)))
            .map_err(|_| MusicError::SessionClosed)?;
        rx.await.map_err(|_| MusicError::SessionClosed)
    }

    pub async fn enqueue(
        &self,
        item: QueueItem,
        voice_channel: ChannelId,
        text_channel: ChannelId,
    ) -> Result<EnqueueOutcome, MusicError> {
        self.request(|reply| SessionCommand::Enqueue {
            item,
            voice_channel,
            text_channel,
            reply,
        })
        .await?
    }

    pub async fn skip(&self) -> Result<(), MusicError> {
        self.request(|reply| SessionCommand::Skip { reply }).await?
    }

    pub async fn pause(&self) -> Result<(), MusicError> {
        self.request(|reply| SessionCommand::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), MusicError> {
        self.request(|reply| SessionCommand::Resume { reply }).await?
    }

    pub async fn stop(&self) -> Result<(), MusicError> {
        self.request(|reply| SessionCommand::Stop { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, MusicError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    pub fn notify(&self, event: SessionEvent) {
        if self.tx.send(SessionMessage::Event(event)).is_err() {
            debug!("Sesión cerrada, evento descartado");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct ActiveSession {
    sink: Box<dyn VoiceSink>,
    text_channel: ChannelId,
    /// Cuándo empezó el join; las actualizaciones de voz previas son obsoletas
    joined_at: Instant,
}

#[derive(Clone, Copy)]
struct JoinTarget {
    voice_channel: ChannelId,
    text_channel: ChannelId,
}

/// Estado completo de la sesión de una guild; solo lo toca su actor
struct GuildSession {
    guild_id: GuildId,
    deps: SessionDeps,
    events: EventSender,
    state: PlaybackState,
    queue: MusicQueue,
    active: Option<ActiveSession>,
    extractor: Option<ExtractorHandle>,
    generation: u64,
    playing_generation: Option<u64>,
}

impl GuildSession {
    fn new(guild_id: GuildId, deps: SessionDeps, events: EventSender) -> Self {
        Self {
            guild_id,
            deps,
            events,
            state: PlaybackState::Idle,
            queue: MusicQueue::new(),
            active: None,
            extractor: None,
            generation: 0,
            playing_generation: None,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMessage>) {
        debug!("🎛️ Sesión iniciada para guild {}", self.guild_id);

        while let Some(message) = rx.recv().await {
            match message {
                SessionMessage::Command(command) => self.handle_command(command).await,
                SessionMessage::Event(event) => self.handle_event(event).await,
            }
        }

        self.terminate(false).await;
        debug!("Sesión finalizada para guild {}", self.guild_id);
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        // El receptor puede haberse ido (interacción expirada); se ignora
        match command {
            SessionCommand::Enqueue {
                item,
                voice_channel,
                text_channel,
                reply,
            } => {
                let result = self
                    .enqueue(
                        item,
                        JoinTarget {
                            voice_channel,
                            text_channel,
                        },
                    )
                    .await;
                let _ = reply.send(result);
            }
            SessionCommand::Skip { reply } => {
                let _ = reply.send(self.skip().await);
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            SessionCommand::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            SessionCommand::Stop { reply } => {
                let _ = reply.send(self.stop().await);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::TrackEnded { generation } => {
                if !self.is_playing(generation) {
                    debug!("Fin de track {} ignorado (obsoleto)", generation);
                    return;
                }
                debug!("🎵 Track {} terminado en guild {}", generation, self.guild_id);
                self.finish_current();
                self.advance_quietly().await;
            }
            SessionEvent::TrackFailed { generation, reason } => {
                if !self.is_playing(generation) {
                    debug!("Error de track {} ignorado (obsoleto)", generation);
                    return;
                }
                self.report(&MusicError::PlaybackError(reason));
                self.finish_current();
                self.advance_quietly().await;
            }
            SessionEvent::ExtractorExited {
                generation,
                success,
                code,
                killed,
            } => {
                if success || killed || !self.is_playing(generation) {
                    debug!(
                        "Salida de yt-dlp {} sin efecto (ok: {}, kill: {})",
                        generation, success, killed
                    );
                    return;
                }
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                self.report(&MusicError::ExtractionFailed(format!("exit {}", code)));
            }
            SessionEvent::VoiceDisconnected { seen_at } => {
                let Some(active) = &self.active else {
                    return;
                };
                if seen_at < active.joined_at {
                    debug!("Desconexión obsoleta ignorada en guild {}", self.guild_id);
                    return;
                }
                info!("🔌 Bot desconectado externamente en guild {}", self.guild_id);
                self.terminate(false).await;
            }
            SessionEvent::VoiceMoved { channel, seen_at } => {
                let Some(active) = self.active.as_mut() else {
                    return;
                };
                if seen_at < active.joined_at || active.sink.channel_id() == channel {
                    return;
                }
                info!(
                    "🔀 Bot movido de {} a {} en guild {}",
                    active.sink.channel_id(),
                    channel,
                    self.guild_id
                );
                active.sink.moved_to(channel);
            }
        }
    }

    async fn enqueue(
        &mut self,
        item: QueueItem,
        target: JoinTarget,
    ) -> Result<EnqueueOutcome, MusicError> {
        let position = self.queue.push(item);

        if self.queue.current().is_some() || self.state != PlaybackState::Idle {
            return Ok(EnqueueOutcome::Queued { position });
        }

        self.advance(Some(target)).await?;
        Ok(EnqueueOutcome::Started)
    }

    async fn skip(&mut self) -> Result<(), MusicError> {
        if self.active.is_none() {
            return Err(MusicError::NothingPlaying);
        }
        if self.queue.current().is_none() && self.queue.is_empty() {
            return Err(MusicError::EmptyQueue);
        }

        info!("⏭️ Saltando track en guild {}", self.guild_id);
        self.finish_current();
        self.advance(None).await
    }

    fn pause(&mut self) -> Result<(), MusicError> {
        let active = self.active.as_mut().ok_or(MusicError::NothingPlaying)?;
        match self.state {
            PlaybackState::Playing => {
                active.sink.pause()?;
                self.state = PlaybackState::Paused;
                info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
                Ok(())
            }
            PlaybackState::Paused => Err(MusicError::AlreadyPaused),
            _ => Err(MusicError::NothingPlaying),
        }
    }

    fn resume(&mut self) -> Result<(), MusicError> {
        let active = self.active.as_mut().ok_or(MusicError::NothingPlaying)?;
        match self.state {
            PlaybackState::Paused => {
                active.sink.resume()?;
                self.state = PlaybackState::Playing;
                info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
                Ok(())
            }
            PlaybackState::Playing => Err(MusicError::AlreadyPlaying),
            _ => Err(MusicError::NothingPlaying),
        }
    }

    async fn stop(&mut self) -> Result<(), MusicError> {
        if self.active.is_none() {
            return Err(MusicError::NotConnected);
        }
        info!("⏹️ Saliendo del canal en guild {}", self.guild_id);
        self.terminate(false).await;
        Ok(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            current: self.queue.current().cloned(),
            upcoming: self.queue.upcoming().cloned().collect(),
            voice_channel: self.active.as_ref().map(|active| active.sink.channel_id()),
            playing_generation: self.playing_generation,
        }
    }

    fn is_playing(&self, generation: u64) -> bool {
        self.playing_generation == Some(generation)
    }

    /// Corta el track actual sin tocar la cola pendiente
    fn finish_current(&mut self) {
        self.playing_generation = None;
        if let Some(extractor) = self.extractor.take() {
            extractor.kill();
        }
        if let Some(active) = self.active.as_mut() {
            active.sink.stop_current();
        }
        self.queue.finish_current();
        self.state = PlaybackState::Idle;
    }

    async fn advance_quietly(&mut self) {
        if let Err(e) = self.advance(None).await {
            warn!("⚠️ No se pudo avanzar la cola en guild {}: {}", self.guild_id, e);
        }
    }

    /// Plays the next pending item, or tears the session down when none is left.
    ///
    /// Items that fail to open or attach are reported and dropped. A voice
    /// join failure clears the queue and is returned to the caller.
    async fn advance(&mut self, target: Option<JoinTarget>) -> Result<(), MusicError> {
        if matches!(
            self.state,
            PlaybackState::Advancing | PlaybackState::Playing | PlaybackState::Paused
        ) {
            debug!("Avance ignorado en estado {:?}", self.state);
            return Ok(());
        }

        loop {
            let Some(item) = self.queue.pop_next() else {
                self.terminate(true).await;
                return Ok(());
            };
            self.state = PlaybackState::Advancing;

            if self.active.is_none() {
                if let Err(e) = self.connect(target).await {
                    warn!("❌ No se pudo unir al canal de voz: {}", e);
                    self.queue.clear();
                    self.state = PlaybackState::Idle;
                    return Err(e);
                }
            }

            match self.start(&item).await {
                Ok(text_channel) => {
                    self.state = PlaybackState::Playing;
                    info!(
                        "🎵 Reproduciendo: {} (pedido por {}, en cola desde {})",
                        item.locator,
                        item.requested_by,
                        item.added_at.format("%H:%M:%S")
                    );
                    self.deps.notifier.now_playing(text_channel, &item);
                    return Ok(());
                }
                Err(e) => {
                    warn!("⚠️ No se pudo reproducir {}: {}", item.locator, e);
                    self.report(&e);
                    self.queue.finish_current();
                }
            }
        }
    }

    async fn connect(&mut self, target: Option<JoinTarget>) -> Result<(), MusicError> {
        let target = target.ok_or(MusicError::NotConnected)?;
        let joined_at = Instant::now();

        let sink = timeout(
            self.deps.settings.join_timeout,
            self.deps
                .connector
                .join(self.guild_id, target.voice_channel, self.events.clone()),
        )
        .await
        .map_err(|_| MusicError::Timeout("voice join"))??;

        self.active = Some(ActiveSession {
            sink,
            text_channel: target.text_channel,
            joined_at,
        });
        Ok(())
    }

    /// Abre el stream y lo conecta al sink; devuelve el canal de texto
    async fn start(&mut self, item: &QueueItem) -> Result<ChannelId, MusicError> {
        self.generation += 1;
        let generation = self.generation;

        let extracted = timeout(
            self.deps.settings.open_timeout,
            self.deps
                .streams
                .open(&item.locator, generation, self.events.clone()),
        )
        .await
        .map_err(|_| MusicError::Timeout("stream open"))??;

        let active = self.active.as_mut().ok_or(MusicError::NotConnected)?;
        if let Err(e) = active.sink.attach(extracted.stream, generation).await {
            extracted.process.kill();
            return Err(e);
        }

        self.extractor = Some(extracted.process);
        self.playing_generation = Some(generation);
        Ok(active.text_channel)
    }

    /// Libera todo; `announce` avisa en el canal de texto que la cola terminó
    async fn terminate(&mut self, announce: bool) {
        self.state = PlaybackState::Terminating;
        self.playing_generation = None;
        if let Some(extractor) = self.extractor.take() {
            extractor.kill();
        }
        self.queue.clear();

        if let Some(mut active) = self.active.take() {
            active.sink.destroy().await;
            if announce {
                self.deps.notifier.queue_drained(active.text_channel);
            }
        }

        self.state = PlaybackState::Idle;
    }

    fn report(&self, error: &MusicError) {
        if let Some(active) = &self.active {
            self.deps.notifier.report(active.text_channel, error);
        }
    }
}

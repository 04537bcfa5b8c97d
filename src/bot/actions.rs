use futures::future::join_all;
use serenity::{
    builder::CreateActionRow,
    model::id::{ChannelId, GuildId, UserId},
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    audio::{
        player::AudioPlayer,
        queue::QueueItem,
        session::{EnqueueOutcome, SessionNotifier},
    },
    error::MusicError,
    sources::LocatorResolver,
    ui::{buttons, messages},
};

/// Operaciones que comparten texto, slash y botones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicAction {
    Play(String),
    ShowQueue,
    Skip,
    Pause,
    Resume,
    Leave,
}

/// Who triggered an action, and from where.
#[derive(Debug, Clone, Copy)]
pub struct Invoker {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub text_channel: ChannelId,
    pub voice_channel: Option<ChannelId>,
}

/// Respuesta a renderizar en la superficie que originó la acción
#[derive(Debug)]
pub enum ActionReply {
    /// Playback started right away; the now-playing announcement answers.
    Started,
    Message {
        content: String,
        components: Vec<CreateActionRow>,
        ephemeral: bool,
    },
}

impl ActionReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            components: Vec::new(),
            ephemeral: false,
        }
    }

    fn with_components(content: impl Into<String>, components: Vec<CreateActionRow>) -> Self {
        Self::Message {
            content: content.into(),
            components,
            ephemeral: false,
        }
    }

    fn private(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            components: Vec::new(),
            ephemeral: true,
        }
    }

    pub fn from_error(error: &MusicError) -> Self {
        if error.is_rejection() {
            Self::private(error.user_message())
        } else {
            Self::text(error.user_message())
        }
    }
}

/// The user must be in the same voice channel the bot is playing in.
pub fn authorize(
    bot_channel: Option<ChannelId>,
    user_channel: Option<ChannelId>,
) -> Result<ChannelId, MusicError> {
    let bot_channel = bot_channel.ok_or(MusicError::NotConnected)?;
    match user_channel {
        Some(channel) if channel == bot_channel => Ok(channel),
        _ => Err(MusicError::NotAuthorized),
    }
}

/// Maps surface actions onto guild sessions
pub struct MusicActions {
    player: Arc<AudioPlayer>,
    resolver: Arc<LocatorResolver>,
}

impl MusicActions {
    pub fn new(player: Arc<AudioPlayer>, resolver: Arc<LocatorResolver>) -> Self {
        Self { player, resolver }
    }

    pub fn player(&self) -> &Arc<AudioPlayer> {
        &self.player
    }

    pub fn resolver(&self) -> &Arc<LocatorResolver> {
        &self.resolver
    }

    /// Ejecuta una acción; los errores se convierten en la respuesta al usuario
    pub async fn execute(
        &self,
        action: MusicAction,
        invoker: Invoker,
        notifier: Arc<dyn SessionNotifier>,
    ) -> ActionReply {
        let result = match action {
            MusicAction::Play(query) => self.play(&query, invoker, notifier).await,
            MusicAction::ShowQueue => self.show_queue(invoker.guild_id).await,
            MusicAction::Skip => self.skip(invoker.guild_id).await,
            MusicAction::Pause => self.pause(invoker.guild_id).await,
            MusicAction::Resume => self.resume(invoker.guild_id).await,
            MusicAction::Leave => self.leave(invoker.guild_id).await,
        };

        result.unwrap_or_else(|e| {
            warn!(
                "⚠️ Acción rechazada en guild {} para {}: {}",
                invoker.guild_id, invoker.user_id, e
            );
            ActionReply::from_error(&e)
        })
    }

    /// Botones: el bot debe estar en voz y el usuario en su mismo canal
    pub async fn authorize_button(&self, invoker: Invoker) -> Result<(), MusicError> {
        let bot_channel = match self.player.existing(invoker.guild_id) {
            Some(session) => session.snapshot().await?.voice_channel,
            None => None,
        };
        authorize(bot_channel, invoker.voice_channel).map(|_| ())
    }

    async fn play(
        &self,
        query: &str,
        invoker: Invoker,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Result<ActionReply, MusicError> {
        if query.trim().is_empty() {
            return Err(MusicError::MissingQuery);
        }
        let voice_channel = invoker.voice_channel.ok_or(MusicError::NoVoiceChannel)?;

        let locator = self.resolver.resolve(query).await?;
        let item = QueueItem::new(locator.clone(), invoker.user_id);

        let session = self.player.session(invoker.guild_id, notifier);
        match session
            .enqueue(item, voice_channel, invoker.text_channel)
            .await?
        {
            EnqueueOutcome::Started => Ok(ActionReply::Started),
            EnqueueOutcome::Queued { position } => {
                let title = self.resolver.title(&locator).await;
                info!("📋 {} en posición {} de la cola", title, position);
                Ok(ActionReply::text(messages::added_to_queue(&title)))
            }
        }
    }

    async fn show_queue(&self, guild_id: GuildId) -> Result<ActionReply, MusicError> {
        let session = self.player.existing(guild_id).ok_or(MusicError::EmptyQueue)?;
        let snapshot = session.snapshot().await?;

        if snapshot.current.is_none() && snapshot.upcoming.is_empty() {
            return Err(MusicError::EmptyQueue);
        }

        let current_title = match &snapshot.current {
            Some(item) => Some(self.resolver.title(&item.locator).await),
            None => None,
        };
        let upcoming = join_all(
            snapshot
                .upcoming
                .iter()
                .map(|item| self.resolver.title(&item.locator)),
        )
        .await;

        Ok(ActionReply::text(messages::render_queue(
            current_title.as_deref(),
            &upcoming,
        )))
    }

    async fn skip(&self, guild_id: GuildId) -> Result<ActionReply, MusicError> {
        let session = self.player.existing(guild_id).ok_or(MusicError::NothingPlaying)?;
        session.skip().await?;
        Ok(ActionReply::text(messages::SKIPPED))
    }

    async fn pause(&self, guild_id: GuildId) -> Result<ActionReply, MusicError> {
        let session = self.player.existing(guild_id).ok_or(MusicError::NothingPlaying)?;
        session.pause().await?;
        Ok(ActionReply::with_components(
            messages::PAUSED,
            buttons::create_paused_buttons(),
        ))
    }

    async fn resume(&self, guild_id: GuildId) -> Result<ActionReply, MusicError> {
        let session = self.player.existing(guild_id).ok_or(MusicError::NothingPlaying)?;
        session.resume().await?;
        Ok(ActionReply::private(messages::RESUMED))
    }

    async fn leave(&self, guild_id: GuildId) -> Result<ActionReply, MusicError> {
        let session = self.player.existing(guild_id).ok_or(MusicError::NotConnected)?;
        session.stop().await?;
        Ok(ActionReply::text(messages::LEFT_CHANNEL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{
            events::EventSender,
            session::SessionSettings,
            events::SessionEvent,
            stream::{ExtractedStream, ExtractorHandle, StreamProvider, TrackStream},
            voice::{VoiceConnector, VoiceSink},
        },
        cache::TitleCache,
        sources::{Locator, MockSearchBackend, SearchHit},
    };
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::{
        io::Cursor,
        time::{Duration, Instant},
    };
    use tokio_util::sync::CancellationToken;

    const VOICE: ChannelId = ChannelId::new(10);
    const TEXT: ChannelId = ChannelId::new(20);

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn push(&self, call: impl Into<String>) {
            self.0.lock().push(call.into());
        }

        fn count(&self, prefix: &str) -> usize {
            self.0.lock().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    struct Fakes(Arc<Calls>);

    #[async_trait]
    impl VoiceConnector for Fakes {
        async fn join(
            &self,
            _guild_id: GuildId,
            channel_id: ChannelId,
            _events: EventSender,
        ) -> Result<Box<dyn VoiceSink>, MusicError> {
            self.0.push("join");
            Ok(Box::new(FakeSink(Arc::clone(&self.0), channel_id)))
        }
    }

    #[async_trait]
    impl StreamProvider for Fakes {
        async fn open(
            &self,
            locator: &Locator,
            _generation: u64,
            _events: EventSender,
        ) -> Result<ExtractedStream, MusicError> {
            Ok(ExtractedStream {
                stream: TrackStream {
                    locator: locator.clone(),
                    source: Box::new(Cursor::new(Vec::<u8>::new())),
                },
                process: ExtractorHandle::new(CancellationToken::new()),
            })
        }
    }

    impl SessionNotifier for Fakes {
        fn now_playing(&self, _text_channel: ChannelId, item: &QueueItem) {
            self.0.push(format!("now playing {}", item.locator));
        }
        fn report(&self, _text_channel: ChannelId, error: &MusicError) {
            self.0.push(format!("report {}", error));
        }
        fn queue_drained(&self, _text_channel: ChannelId) {
            self.0.push("drained");
        }
    }

    struct FakeSink(Arc<Calls>, ChannelId);

    #[async_trait]
    impl VoiceSink for FakeSink {
        fn channel_id(&self) -> ChannelId {
            self.1
        }
        fn moved_to(&mut self, channel_id: ChannelId) {
            self.1 = channel_id;
        }
        async fn attach(&mut self, stream: TrackStream, _generation: u64) -> Result<(), MusicError> {
            self.0.push(format!("attach {}", stream.locator));
            Ok(())
        }
        fn pause(&mut self) -> Result<(), MusicError> {
            self.0.push("pause");
            Ok(())
        }
        fn resume(&mut self) -> Result<(), MusicError> {
            self.0.push("resume");
            Ok(())
        }
        fn stop_current(&mut self) {
            self.0.push("stop");
        }
        async fn destroy(&mut self) {
            self.0.push("destroy");
        }
    }

    fn song(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }

    fn setup(backend: MockSearchBackend) -> (MusicActions, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let player = AudioPlayer::new(
            Arc::new(Fakes(Arc::clone(&calls))),
            Arc::new(Fakes(Arc::clone(&calls))),
            SessionSettings {
                join_timeout: Duration::from_secs(1),
                open_timeout: Duration::from_secs(1),
            },
        );
        let resolver = LocatorResolver::new(
            Arc::new(backend),
            TitleCache::new(32, Duration::from_secs(60)),
            Duration::from_secs(1),
        );
        (MusicActions::new(Arc::new(player), Arc::new(resolver)), calls)
    }

    fn titled_backend() -> MockSearchBackend {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_lookup_title()
            .returning(|id| Ok(Some(format!("Song {}", id))));
        backend
    }

    fn invoker(voice_channel: Option<ChannelId>) -> Invoker {
        Invoker {
            guild_id: GuildId::new(1),
            user_id: UserId::new(2),
            text_channel: TEXT,
            voice_channel,
        }
    }

    fn content(reply: ActionReply) -> (String, bool) {
        match reply {
            ActionReply::Message {
                content, ephemeral, ..
            } => (content, ephemeral),
            ActionReply::Started => panic!("se esperaba un mensaje"),
        }
    }

    async fn run(actions: &MusicActions, calls: &Arc<Calls>, action: MusicAction) -> ActionReply {
        actions
            .execute(action, invoker(Some(VOICE)), Arc::new(Fakes(Arc::clone(calls))))
            .await
    }

    #[test]
    fn test_authorize() {
        let bot = ChannelId::new(5);
        let other = ChannelId::new(6);
        assert_eq!(authorize(Some(bot), Some(bot)).unwrap(), bot);
        assert!(matches!(authorize(Some(bot), Some(other)), Err(MusicError::NotAuthorized)));
        assert!(matches!(authorize(Some(bot), None), Err(MusicError::NotAuthorized)));
        assert!(matches!(authorize(None, Some(bot)), Err(MusicError::NotConnected)));
    }

    #[tokio::test]
    async fn test_play_then_queue_flow() {
        let (actions, calls) = setup(titled_backend());

        let reply = run(&actions, &calls, MusicAction::Play(song("a"))).await;
        assert!(matches!(reply, ActionReply::Started));

        let reply = run(&actions, &calls, MusicAction::Play(song("b"))).await;
        assert_eq!(content(reply).0, "🎵 Added to queue: Song b");

        let reply = run(&actions, &calls, MusicAction::ShowQueue).await;
        assert_eq!(
            content(reply).0,
            "🎵 Now Playing: Song a\n📜 Queue:\n1. Song b\n"
        );
        assert_eq!(calls.count("attach"), 1);
    }

    #[tokio::test]
    async fn test_play_searches_free_text() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_search_top()
            .with(eq("rick astley"))
            .returning(|_| {
                Ok(Some(SearchHit {
                    url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
                    title: "Never Gonna Give You Up".into(),
                }))
            });
        let (actions, calls) = setup(backend);

        let reply = run(&actions, &calls, MusicAction::Play("rick astley".into())).await;

        assert!(matches!(reply, ActionReply::Started));
        assert_eq!(
            *calls.0.lock(),
            vec![
                "join".to_string(),
                "attach https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                "now playing https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_play_requires_query_then_voice() {
        let (actions, calls) = setup(MockSearchBackend::new());
        let notifier: Arc<dyn SessionNotifier> = Arc::new(Fakes(Arc::clone(&calls)));

        let reply = actions
            .execute(MusicAction::Play("  ".into()), invoker(None), Arc::clone(&notifier))
            .await;
        assert_eq!(
            content(reply).0,
            "❌ You need to provide a YouTube link or song name!"
        );

        let reply = actions
            .execute(MusicAction::Play(song("a")), invoker(None), notifier)
            .await;
        assert_eq!(content(reply).0, "❌ You need to join a voice channel first!");
        assert_eq!(calls.count("join"), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_and_idle_controls() {
        let (actions, calls) = setup(MockSearchBackend::new());

        let (text, ephemeral) = content(run(&actions, &calls, MusicAction::ShowQueue).await);
        assert_eq!(text, "❌ The queue is empty!");
        assert!(ephemeral);

        let (text, _) = content(run(&actions, &calls, MusicAction::Pause).await);
        assert_eq!(text, "❌ Nothing is playing!");

        let (text, _) = content(run(&actions, &calls, MusicAction::Leave).await);
        assert_eq!(text, "❌ I'm not in a voice channel!");
    }

    #[tokio::test]
    async fn test_pause_resume_and_leave() {
        let (actions, calls) = setup(titled_backend());
        run(&actions, &calls, MusicAction::Play(song("a"))).await;

        match run(&actions, &calls, MusicAction::Pause).await {
            ActionReply::Message {
                content,
                components,
                ephemeral,
            } => {
                assert_eq!(content, "⏸️ Paused the music!");
                assert_eq!(components.len(), 1);
                assert!(!ephemeral);
            }
            ActionReply::Started => panic!("se esperaba un mensaje"),
        }

        let (text, _) = content(run(&actions, &calls, MusicAction::Pause).await);
        assert_eq!(text, "⏸️ Already paused!");

        let (text, _) = content(run(&actions, &calls, MusicAction::Resume).await);
        assert_eq!(text, "▶️ Resumed the music!");

        let (text, _) = content(run(&actions, &calls, MusicAction::Leave).await);
        assert_eq!(text, "👋 BeatBuddy has left the channel");

        let (text, _) = content(run(&actions, &calls, MusicAction::Pause).await);
        assert_eq!(text, "❌ Nothing is playing!");
        assert_eq!(calls.count("destroy"), 1);
    }

    #[tokio::test]
    async fn test_button_authorization_changes_nothing() {
        let (actions, calls) = setup(titled_backend());

        let outsider = invoker(Some(ChannelId::new(99)));
        assert!(matches!(
            actions.authorize_button(outsider).await,
            Err(MusicError::NotConnected)
        ));

        run(&actions, &calls, MusicAction::Play(song("a"))).await;

        assert!(matches!(
            actions.authorize_button(outsider).await,
            Err(MusicError::NotAuthorized)
        ));
        assert!(matches!(
            actions.authorize_button(invoker(None)).await,
            Err(MusicError::NotAuthorized)
        ));
        actions.authorize_button(invoker(Some(VOICE))).await.unwrap();

        let snapshot = actions
            .player()
            .existing(GuildId::new(1))
            .unwrap()
            .snapshot()
            .await
            .unwrap();
        assert_eq!(snapshot.current.unwrap().locator.as_str(), song("a"));
        assert_eq!(calls.count("pause") + calls.count("stop"), 0);
    }

    #[tokio::test]
    async fn test_buttons_follow_bot_after_move() {
        let (actions, calls) = setup(titled_backend());
        run(&actions, &calls, MusicAction::Play(song("a"))).await;

        let moved = ChannelId::new(11);
        let session = actions.player().existing(GuildId::new(1)).unwrap();
        session.notify(SessionEvent::VoiceMoved {
            channel: moved,
            seen_at: Instant::now(),
        });

        actions.authorize_button(invoker(Some(moved))).await.unwrap();
        assert!(matches!(
            actions.authorize_button(invoker(Some(VOICE))).await,
            Err(MusicError::NotAuthorized)
        ));
        assert_eq!(calls.count("join"), 1);
    }

    #[tokio::test]
    async fn test_skip_moves_to_next_song() {
        let (actions, calls) = setup(titled_backend());
        run(&actions, &calls, MusicAction::Play(song("a"))).await;
        run(&actions, &calls, MusicAction::Play(song("b"))).await;

        let (text, _) = content(run(&actions, &calls, MusicAction::Skip).await);
        assert_eq!(text, "⏭️ Skipped the current song!");
        assert_eq!(calls.count("attach"), 2);

        let (text, _) = content(run(&actions, &calls, MusicAction::ShowQueue).await);
        assert_eq!(text, "🎵 Now Playing: Song b\n📜 Queue: (empty)");
    }
}

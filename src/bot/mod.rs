//! # Bot Module
//!
//! Discord surface for BeatBuddy.
//!
//! This module maps the three ways users talk to the bot onto the same set of
//! music actions:
//! - Text commands (`/play <query>`, `/queue`, `.` to leave)
//! - Slash commands (`play`, `queue`)
//! - Player buttons (`skip`, `pause`, `play`, `queue`)
//!
//! ## Architecture
//!
//! [`BeatBuddy`] implements Serenity's [`EventHandler`]. Every handler builds
//! an [`actions::Invoker`] from the cache (guild, user, text channel and the
//! user's voice channel) and hands a [`actions::MusicAction`] to
//! [`actions::MusicActions`], which talks to the per-guild sessions in
//! [`AudioPlayer`]. Button clicks are authorized first: the clicking user must
//! share the bot's voice channel.
//!
//! Session announcements ("Now Playing", failures, queue drained) are posted
//! by [`notifier::DiscordNotifier`].

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Message, Ready, VoiceState},
    async_trait,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::{error, info, warn};

pub mod actions;
pub mod commands;
pub mod handlers;
pub mod notifier;
pub mod text_commands;

use crate::{
    audio::{events::SessionEvent, player::AudioPlayer},
    config::Config,
    sources::{LocatorResolver, YtDlpStreamProvider},
};
use actions::MusicActions;

/// Intervalo de las tareas de mantenimiento
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

/// Main Discord event handler.
pub struct BeatBuddy {
    config: Arc<Config>,
    actions: MusicActions,
    extractor: Arc<YtDlpStreamProvider>,
    maintenance_started: AtomicBool,
}

impl BeatBuddy {
    pub fn new(
        config: Config,
        player: Arc<AudioPlayer>,
        resolver: Arc<LocatorResolver>,
        extractor: Arc<YtDlpStreamProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            actions: MusicActions::new(player, resolver),
            extractor,
            maintenance_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn actions(&self) -> &MusicActions {
        &self.actions
    }

    /// Registers slash commands on the configured guild, or globally.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for BeatBuddy {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("✅ {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("❌ Error al registrar comandos: {:?}", e);
        }

        // ready se repite tras cada reconexión
        if self.maintenance_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let player = Arc::clone(self.actions.player());
        let resolver = Arc::clone(self.actions.resolver());
        let extractor = Arc::clone(&self.extractor);
        tokio::spawn(async move {
            maintenance_tasks(player, resolver, extractor).await;
        });
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = handlers::handle_message(&ctx, msg, self).await {
            error!("Error manejando mensaje: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Forwards the bot's own voice moves and disconnects to its guild session.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let seen_at = Instant::now();
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };
        let Some(session) = self.actions.player().existing(guild_id) else {
            return;
        };

        match new.channel_id {
            Some(channel) => session.notify(SessionEvent::VoiceMoved { channel, seen_at }),
            None => {
                info!("🔌 Bot sin canal de voz en guild {}", guild_id);
                session.notify(SessionEvent::VoiceDisconnected { seen_at });
            }
        }
    }
}

/// Hourly housekeeping: expire cached titles and re-check `yt-dlp`.
async fn maintenance_tasks(
    player: Arc<AudioPlayer>,
    resolver: Arc<LocatorResolver>,
    extractor: Arc<YtDlpStreamProvider>,
) {
    let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
    // El primer tick es inmediato
    interval.tick().await;

    loop {
        interval.tick().await;

        resolver.titles().cleanup_old_entries();

        if let Err(e) = extractor.verify_dependencies().await {
            warn!("Error verificando dependencias: {:?}", e);
        }

        info!(
            "🧹 Tareas de mantenimiento completadas ({} sesiones, {} títulos en caché)",
            player.active_sessions(),
            resolver.titles().len()
        );
    }
}

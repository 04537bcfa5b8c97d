use serenity::{
    builder::CreateMessage,
    cache::Cache,
    http::Http,
    model::{
        id::{ChannelId, GuildId},
        permissions::Permissions,
    },
};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::{
    audio::{queue::QueueItem, session::SessionNotifier},
    error::MusicError,
    sources::LocatorResolver,
    ui::{buttons, messages},
};

/// Publica los anuncios de una sesión en Discord
pub struct DiscordNotifier {
    http: Arc<Http>,
    cache: Arc<Cache>,
    resolver: Arc<LocatorResolver>,
    guild_id: GuildId,
}

impl DiscordNotifier {
    pub fn new(
        http: Arc<Http>,
        cache: Arc<Cache>,
        resolver: Arc<LocatorResolver>,
        guild_id: GuildId,
    ) -> Self {
        Self {
            http,
            cache,
            resolver,
            guild_id,
        }
    }

    /// Whether the bot may post (with embeds) in `channel`.
    ///
    /// Unknown cache state counts as allowed; Discord rejects the send anyway.
    fn can_announce(&self, channel: ChannelId) -> bool {
        let bot_id = self.cache.current_user().id;
        let Some(guild) = self.cache.guild(self.guild_id) else {
            debug!("Guild {} no está en caché", self.guild_id);
            return true;
        };
        let (Some(channel), Some(member)) = (guild.channels.get(&channel), guild.members.get(&bot_id))
        else {
            return true;
        };

        guild
            .user_permissions_in(channel, member)
            .contains(Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS)
    }

    fn send(&self, channel: ChannelId, message: CreateMessage) {
        let http = Arc::clone(&self.http);
        tokio::spawn(async move {
            if let Err(e) = channel.send_message(&*http, message).await {
                error!("❌ Error enviando mensaje a {}: {:?}", channel, e);
            }
        });
    }
}

impl SessionNotifier for DiscordNotifier {
    fn now_playing(&self, text_channel: ChannelId, item: &QueueItem) {
        if !self.can_announce(text_channel) {
            warn!(
                "⚠️ {} (canal {})",
                MusicError::PermissionDenied,
                text_channel
            );
            return;
        }

        let http = Arc::clone(&self.http);
        let resolver = Arc::clone(&self.resolver);
        let locator = item.locator.clone();
        tokio::spawn(async move {
            let title = resolver.title(&locator).await;
            let message = CreateMessage::new()
                .content(messages::now_playing(&title))
                .components(buttons::create_player_buttons());

            if let Err(e) = text_channel.send_message(&*http, message).await {
                error!("❌ Error enviando 'Now Playing': {:?}", e);
            }
        });
    }

    fn report(&self, text_channel: ChannelId, error: &MusicError) {
        self.send(
            text_channel,
            CreateMessage::new().content(error.user_message()),
        );
    }

    fn queue_drained(&self, text_channel: ChannelId) {
        self.send(
            text_channel,
            CreateMessage::new().content(messages::QUEUE_DRAINED),
        );
    }
}

use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage,
        EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    actions::{ActionReply, Invoker, MusicAction},
    commands::SONG_OPTION,
    notifier::DiscordNotifier,
    text_commands::{self, TextCommand},
    BeatBuddy,
};
use crate::{
    audio::session::SessionNotifier,
    ui::{buttons::ButtonAction, messages},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &BeatBuddy,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let invoker = build_invoker(ctx, guild_id, command.user.id, command.channel_id);

    match command.data.name.as_str() {
        "play" => {
            let query = command
                .data
                .options
                .iter()
                .find(|opt| opt.name == SONG_OPTION)
                .and_then(|opt| opt.value.as_str())
                .unwrap_or_default()
                .to_string();

            // Buscar y conectar puede tardar más que el límite de 3s
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
                )
                .await?;

            let reply = bot
                .actions()
                .execute(MusicAction::Play(query), invoker, notifier(ctx, bot, guild_id))
                .await;

            match reply {
                ActionReply::Started => command.delete_response(&ctx.http).await?,
                ActionReply::Message {
                    content,
                    components,
                    ..
                } => {
                    command
                        .edit_response(
                            &ctx.http,
                            EditInteractionResponse::new()
                                .content(content)
                                .components(components),
                        )
                        .await?;
                }
            }
        }
        "queue" => {
            let reply = bot
                .actions()
                .execute(MusicAction::ShowQueue, invoker, notifier(ctx, bot, guild_id))
                .await;
            respond_command(ctx, &command, reply).await?;
        }
        other => {
            debug!("Comando desconocido: {}", other);
        }
    }

    Ok(())
}

/// Maneja los botones del reproductor
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &BeatBuddy,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    let Some(button) = ButtonAction::from_custom_id(&component.data.custom_id) else {
        debug!("Botón desconocido: {}", component.data.custom_id);
        return Ok(());
    };

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    let invoker = build_invoker(ctx, guild_id, component.user.id, component.channel_id);

    let reply = match bot.actions().authorize_button(invoker).await {
        Ok(()) => {
            let action = match button {
                ButtonAction::Skip => MusicAction::Skip,
                ButtonAction::Pause => MusicAction::Pause,
                ButtonAction::Resume => MusicAction::Resume,
                ButtonAction::ShowQueue => MusicAction::ShowQueue,
            };
            bot.actions()
                .execute(action, invoker, notifier(ctx, bot, guild_id))
                .await
        }
        Err(e) => {
            debug!("Botón rechazado para {}: {}", component.user.name, e);
            ActionReply::from_error(&e)
        }
    };

    if let ActionReply::Message {
        content,
        components,
        ephemeral,
    } = reply
    {
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(content)
                        .components(components)
                        .ephemeral(ephemeral),
                ),
            )
            .await?;
    }

    Ok(())
}

/// Maneja comandos de texto (`/play`, `/queue`, `.`)
pub async fn handle_message(ctx: &Context, msg: Message, bot: &BeatBuddy) -> Result<()> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let config = bot.config();
    let Some(command) =
        text_commands::parse(&msg.content, &config.command_prefix, &config.leave_command)
    else {
        return Ok(());
    };

    info!(
        "💬 Comando de texto {:?} de {} en guild {}",
        command, msg.author.name, guild_id
    );

    let action = match command {
        TextCommand::Play(query) => MusicAction::Play(query),
        TextCommand::Queue => MusicAction::ShowQueue,
        TextCommand::Leave => MusicAction::Leave,
        TextCommand::QueueWithArgs => {
            msg.reply(&ctx.http, messages::QUEUE_USAGE).await?;
            return Ok(());
        }
    };

    let invoker = build_invoker(ctx, guild_id, msg.author.id, msg.channel_id);
    let reply = bot
        .actions()
        .execute(action, invoker, notifier(ctx, bot, guild_id))
        .await;

    if let ActionReply::Message {
        content,
        components,
        ..
    } = reply
    {
        msg.channel_id
            .send_message(
                &ctx.http,
                CreateMessage::new()
                    .content(content)
                    .components(components)
                    .reference_message(&msg),
            )
            .await?;
    }

    Ok(())
}

async fn respond_command(
    ctx: &Context,
    command: &CommandInteraction,
    reply: ActionReply,
) -> Result<()> {
    if let ActionReply::Message {
        content,
        components,
        ephemeral,
    } = reply
    {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(content)
                        .components(components)
                        .ephemeral(ephemeral),
                ),
            )
            .await?;
    }
    Ok(())
}

// Funciones auxiliares

fn build_invoker(ctx: &Context, guild_id: GuildId, user_id: UserId, text_channel: ChannelId) -> Invoker {
    Invoker {
        guild_id,
        user_id,
        text_channel,
        voice_channel: get_user_voice_channel(ctx, guild_id, user_id),
    }
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

fn notifier(ctx: &Context, bot: &BeatBuddy, guild_id: GuildId) -> Arc<dyn SessionNotifier> {
    Arc::new(DiscordNotifier::new(
        Arc::clone(&ctx.http),
        Arc::clone(&ctx.cache),
        Arc::clone(bot.actions().resolver()),
        guild_id,
    ))
}

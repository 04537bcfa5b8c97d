use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::{Command, CommandOptionType},
        id::GuildId,
    },
    prelude::Context,
};

/// Nombre de la opción de `/play`
pub const SONG_OPTION: &str = "song";

fn slash_commands() -> Vec<CreateCommand> {
    vec![play_command(), queue_command()]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    Command::set_global_commands(&ctx.http, slash_commands()).await?;
    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, slash_commands()).await?;
    Ok(())
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a song by name or YouTube URL")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                SONG_OPTION,
                "Song name or YouTube URL",
            )
            .required(true),
        )
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show the current music queue")
}

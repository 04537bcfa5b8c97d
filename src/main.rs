use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod cache;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::{
    player::AudioPlayer,
    session::SessionSettings,
    voice::SongbirdConnector,
};
use crate::bot::BeatBuddy;
use crate::cache::TitleCache;
use crate::config::Config;
use crate::sources::{LocatorResolver, YouTubeClient, YtDlpStreamProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("beatbuddy=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    // El health check no necesita token ni conexión a Discord
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    info!("🎵 Iniciando BeatBuddy v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let extractor = Arc::new(YtDlpStreamProvider::new(config.ytdlp_path.clone()));
    if let Err(e) = extractor.verify_dependencies().await {
        error!("❌ yt-dlp no disponible, la reproducción fallará: {:?}", e);
    }

    // Búsqueda y títulos
    let titles = TitleCache::new(config.title_cache_size, config.title_cache_ttl);
    let youtube = YouTubeClient::new(config.ytdlp_path.clone(), config.search_timeout)?;
    let resolver = Arc::new(LocatorResolver::new(
        Arc::new(youtube),
        titles,
        config.search_timeout,
    ));

    // Voz y sesiones
    let songbird = Songbird::serenity();
    let player = Arc::new(AudioPlayer::new(
        Arc::new(SongbirdConnector::new(
            Arc::clone(&songbird),
            config.default_volume,
        )),
        Arc::clone(&extractor) as _,
        SessionSettings {
            join_timeout: config.voice_join_timeout,
            open_timeout: config.stream_timeout,
        },
    ));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord_token.clone();
    let handler = BeatBuddy::new(config, player, resolver, extractor);

    // Construir cliente
    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    dotenvy::dotenv().ok();
    let ytdlp_path = std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());

    YtDlpStreamProvider::new(ytdlp_path)
        .verify_dependencies()
        .await?;

    println!("OK");
    Ok(())
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::VecDeque, process::Stdio, sync::Arc};
use symphonia::core::io::ReadOnlySource;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStderr, Command},
};
use tokio_util::{io::SyncIoBridge, sync::CancellationToken};
use tracing::{debug, error, info, warn};

use super::Locator;
use crate::{
    audio::{
        events::{EventSender, SessionEvent},
        stream::{ExtractedStream, ExtractorHandle, StreamProvider, TrackStream},
    },
    error::MusicError,
};

/// Líneas de stderr conservadas para el log de fallos
const STDERR_TAIL: usize = 8;

/// Lanza `yt-dlp` y entrega su stdout como stream de audio
pub struct YtDlpStreamProvider {
    ytdlp_path: String,
}

impl YtDlpStreamProvider {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    /// Verifica que yt-dlp esté disponible
    pub async fn verify_dependencies(&self) -> Result<String> {
        let output = Command::new(&self.ytdlp_path)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("No se pudo ejecutar {}", self.ytdlp_path))?;

        if !output.status.success() {
            error!("❌ yt-dlp no encontrado. Instala con: pip install yt-dlp");
            anyhow::bail!("yt-dlp no disponible ({})", output.status);
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("✅ yt-dlp versión: {}", version);
        Ok(version)
    }

    fn extraction_args(locator: &Locator) -> [&str; 9] {
        [
            "-f",
            "bestaudio",
            "-o",
            "-",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "--",
            locator.as_str(),
        ]
    }
}

#[async_trait]
impl StreamProvider for YtDlpStreamProvider {
    async fn open(
        &self,
        locator: &Locator,
        generation: u64,
        events: EventSender,
    ) -> Result<ExtractedStream, MusicError> {
        debug!("🎬 Lanzando yt-dlp para {} (track {})", locator, generation);

        let mut child = Command::new(&self.ytdlp_path)
            .args(Self::extraction_args(locator))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MusicError::ExtractionFailed(format!("spawn: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MusicError::ExtractionFailed("stdout no disponible".into()))?;

        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL)));
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(collect_stderr(stderr, Arc::clone(&tail)));
        }

        let cancel = CancellationToken::new();
        tokio::spawn(watch_process(
            child,
            cancel.clone(),
            generation,
            events,
            tail,
        ));

        let source = ReadOnlySource::new(SyncIoBridge::new(stdout));

        Ok(ExtractedStream {
            stream: TrackStream {
                locator: locator.clone(),
                source: Box::new(source),
            },
            process: ExtractorHandle::new(cancel),
        })
    }
}

async fn collect_stderr(stderr: ChildStderr, tail: Arc<Mutex<VecDeque<String>>>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("yt-dlp: {}", line);
        let mut tail = tail.lock();
        if tail.len() == STDERR_TAIL {
            tail.pop_front();
        }
        tail.push_back(line);
    }
}

/// Espera la salida del proceso (o el kill) y avisa a la sesión
async fn watch_process(
    mut child: Child,
    cancel: CancellationToken,
    generation: u64,
    events: EventSender,
    tail: Arc<Mutex<VecDeque<String>>>,
) {
    let (status, killed) = tokio::select! {
        status = child.wait() => (status, false),
        _ = cancel.cancelled() => {
            if let Err(e) = child.start_kill() {
                debug!("yt-dlp ya había terminado: {}", e);
            }
            (child.wait().await, true)
        }
    };

    let (success, code) = match status {
        Ok(status) => (status.success(), status.code()),
        Err(e) => {
            warn!("⚠️ No se pudo esperar a yt-dlp: {}", e);
            (false, None)
        }
    };

    if !success && !killed {
        let tail: Vec<String> = tail.lock().iter().cloned().collect();
        error!(
            "❌ yt-dlp terminó con código {:?} (track {}): {}",
            code,
            generation,
            tail.join(" | ")
        );
    } else {
        debug!(
            "yt-dlp terminó (track {}, código {:?}, kill {})",
            generation, code, killed
        );
    }

    events.send(SessionEvent::ExtractorExited {
        generation,
        success,
        code,
        killed,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_args_stream_to_stdout() {
        let locator = Locator::new("https://youtu.be/dQw4w9WgXcQ");
        let args = YtDlpStreamProvider::extraction_args(&locator);
        assert_eq!(&args[..4], &["-f", "bestaudio", "-o", "-"]);
        assert!(args.contains(&"--no-playlist"));
        assert_eq!(args.last(), Some(&"https://youtu.be/dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_open() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let provider = YtDlpStreamProvider::new("/nonexistent/yt-dlp-binary");
        let result = provider
            .open(&Locator::new("https://youtu.be/x"), 1, EventSender::new(tx))
            .await;
        assert!(matches!(result, Err(MusicError::ExtractionFailed(_))));
    }

    #[tokio::test]
    async fn test_verify_missing_binary() {
        let provider = YtDlpStreamProvider::new("/nonexistent/yt-dlp-binary");
        assert!(provider.verify_dependencies().await.is_err());
    }
}

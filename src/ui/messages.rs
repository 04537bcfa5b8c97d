//! Fixed reply texts and queue rendering.

pub const SKIPPED: &str = "⏭️ Skipped the current song!";
pub const PAUSED: &str = "⏸️ Paused the music!";
pub const RESUMED: &str = "▶️ Resumed the music!";
pub const LEFT_CHANNEL: &str = "👋 BeatBuddy has left the channel";
pub const QUEUE_DRAINED: &str = "🎵 Queue is empty, disconnecting...";
pub const QUEUE_USAGE: &str = "❌ The `/queue` command does not take arguments. To add a song, use `/play <song name>`. To view the queue, just type `/queue` or use the See queue button.";

pub fn now_playing(title: &str) -> String {
    format!("🎵 Now Playing: {}", title)
}

pub fn added_to_queue(title: &str) -> String {
    format!("🎵 Added to queue: {}", title)
}

/// Renderiza la cola: línea de "Now Playing" (si hay) y la lista numerada
pub fn render_queue(now_playing_title: Option<&str>, upcoming: &[String]) -> String {
    let mut message = String::new();

    if let Some(title) = now_playing_title {
        message.push_str(&now_playing(title));
        message.push('\n');
    }

    if upcoming.is_empty() {
        message.push_str("📜 Queue: (empty)");
    } else {
        message.push_str("📜 Queue:\n");
        for (i, title) in upcoming.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", i + 1, title));
        }
    }

    message
}

/// Comandos de texto reconocidos en mensajes normales
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    /// `<prefix>play <query>`; la query puede venir vacía
    Play(String),
    Queue,
    /// `<prefix>queue` con argumentos, que no acepta
    QueueWithArgs,
    Leave,
}

/// Parses a chat message into a command.
///
/// Only the first whitespace-separated word selects the command, compared
/// case-insensitively. Everything after it is the argument text.
pub fn parse(content: &str, prefix: &str, leave: &str) -> Option<TextCommand> {
    let content = content.trim();
    let (head, rest) = match content.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (content, ""),
    };
    let head = head.to_lowercase();

    if head == leave.to_lowercase() {
        return Some(TextCommand::Leave);
    }

    match head.strip_prefix(prefix.to_lowercase().as_str())? {
        "play" => Some(TextCommand::Play(rest.to_string())),
        "queue" if rest.is_empty() => Some(TextCommand::Queue),
        "queue" => Some(TextCommand::QueueWithArgs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(content: &str) -> Option<TextCommand> {
        parse(content, "/", ".")
    }

    #[test]
    fn test_play_keeps_full_query() {
        assert_eq!(
            parse_default("/play never gonna  give you up"),
            Some(TextCommand::Play("never gonna  give you up".into()))
        );
        assert_eq!(
            parse_default("/PLAY https://youtu.be/dQw4w9WgXcQ"),
            Some(TextCommand::Play("https://youtu.be/dQw4w9WgXcQ".into()))
        );
        assert_eq!(parse_default("/play"), Some(TextCommand::Play(String::new())));
    }

    #[test]
    fn test_queue_rejects_arguments() {
        assert_eq!(parse_default("/queue"), Some(TextCommand::Queue));
        assert_eq!(parse_default("/queue some song"), Some(TextCommand::QueueWithArgs));
    }

    #[test]
    fn test_leave_token() {
        assert_eq!(parse_default("."), Some(TextCommand::Leave));
        assert_eq!(parse_default(" . "), Some(TextCommand::Leave));
        assert_eq!(parse("bye", "!", "bye"), Some(TextCommand::Leave));
    }

    #[test]
    fn test_configured_tokens_ignore_case() {
        assert_eq!(parse("bye", "!", "Bye"), Some(TextCommand::Leave));
        assert_eq!(parse("BYE", "!", "Bye"), Some(TextCommand::Leave));
        assert_eq!(parse("bb!queue", "BB!", "."), Some(TextCommand::Queue));
    }

    #[test]
    fn test_unrelated_messages() {
        assert_eq!(parse_default("hola a todos"), None);
        assert_eq!(parse_default("/skip"), None);
        assert_eq!(parse_default("play something"), None);
        assert_eq!(parse_default(""), None);
        assert_eq!(parse("/play x", "!", "."), None);
    }
}

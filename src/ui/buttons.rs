use serenity::{all::ButtonStyle, builder::{CreateActionRow, CreateButton}};

/// IDs personalizados para los botones
pub mod button_ids {
    pub const SKIP: &str = "skip";
    pub const PAUSE: &str = "pause";
    pub const PLAY: &str = "play";
    pub const QUEUE: &str = "queue";
}

/// Acción asociada a un botón
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Skip,
    Pause,
    Resume,
    ShowQueue,
}

impl ButtonAction {
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            button_ids::SKIP => Some(Self::Skip),
            button_ids::PAUSE => Some(Self::Pause),
            button_ids::PLAY => Some(Self::Resume),
            button_ids::QUEUE => Some(Self::ShowQueue),
            _ => None,
        }
    }
}

fn skip_button() -> CreateButton {
    CreateButton::new(button_ids::SKIP)
        .label("Skip")
        .style(ButtonStyle::Primary)
}

fn play_button() -> CreateButton {
    CreateButton::new(button_ids::PLAY)
        .label("Play")
        .style(ButtonStyle::Success)
}

fn queue_button() -> CreateButton {
    CreateButton::new(button_ids::QUEUE)
        .label("See queue")
        .style(ButtonStyle::Primary)
}

/// Controles que acompañan al anuncio de "Now Playing"
pub fn create_player_buttons() -> Vec<CreateActionRow> {
    let pause = CreateButton::new(button_ids::PAUSE)
        .label("Pause")
        .style(ButtonStyle::Danger);

    vec![CreateActionRow::Buttons(vec![
        skip_button(),
        pause,
        play_button(),
        queue_button(),
    ])]
}

/// Controles reducidos mientras la música está en pausa
pub fn create_paused_buttons() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        play_button(),
        skip_button(),
        queue_button(),
    ])]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_ids_map_to_actions() {
        assert_eq!(ButtonAction::from_custom_id("skip"), Some(ButtonAction::Skip));
        assert_eq!(ButtonAction::from_custom_id("pause"), Some(ButtonAction::Pause));
        assert_eq!(ButtonAction::from_custom_id("play"), Some(ButtonAction::Resume));
        assert_eq!(ButtonAction::from_custom_id("queue"), Some(ButtonAction::ShowQueue));
        assert_eq!(ButtonAction::from_custom_id("music_stop"), None);
    }

    #[test]
    fn test_button_rows() {
        let CreateActionRow::Buttons(buttons) = &create_player_buttons()[0] else {
            panic!("se esperaba una fila de botones");
        };
        assert_eq!(buttons.len(), 4);

        let CreateActionRow::Buttons(buttons) = &create_paused_buttons()[0] else {
            panic!("se esperaba una fila de botones");
        };
        assert_eq!(buttons.len(), 3);
    }
}

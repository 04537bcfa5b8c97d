pub mod buttons;
pub mod messages;

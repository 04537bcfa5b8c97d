//! # Audio Module
//!
//! Playback core for BeatBuddy.
//!
//! ## Architecture
//!
//! ### [`session`] - Guild Sessions
//! - One actor task per guild owns the queue, the voice sink and the
//!   running extraction process
//! - Commands and sink/process notifications arrive on the same channel,
//!   so every transition is applied one at a time
//! - Each attached track gets a generation number; notifications for any
//!   other generation are dropped
//!
//! ### [`player`] - Session Registry
//! - Maps guild IDs to session handles and respawns dead actors
//!
//! ### [`queue`] - Queue Management
//! - Strict FIFO pending list plus the current item
//!
//! ### [`voice`] / [`stream`] - Seams
//! - [`voice::VoiceConnector`] and [`voice::VoiceSink`] wrap songbird
//! - [`stream::StreamProvider`] wraps the `yt-dlp` process
//!
//! ## States
//!
//! ```text
//! Idle ──enqueue──▶ Advancing ──attach──▶ Playing ◀──resume── Paused
//!   ▲                   │                   │  └────pause────────▲
//!   └── Terminating ◀───┴──── queue empty ──┘
//! ```

pub mod events;
pub mod player;
pub mod queue;
pub mod session;
pub mod stream;
pub mod voice;

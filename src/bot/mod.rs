//! Chat front end: events in, notifications out.

pub mod events;
pub mod input;
pub mod operator;
pub mod player;
pub mod router;
pub mod session;
pub mod telegram;
pub mod texts;

pub use events::{Event, Sender};
pub use router::{Router, RouterSettings};
pub use telegram::{TelegramClient, TelegramGate};

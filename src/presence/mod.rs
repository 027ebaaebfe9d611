//! Player presence and message delivery

pub mod directory;
pub mod notify;

pub use directory::{PresenceDirectory, PresenceEvent};
pub use notify::{render, LogSink, StdoutSink};

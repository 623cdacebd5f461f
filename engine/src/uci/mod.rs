//! Engine-to-server half of the UCI text protocol. Commands going the other
//! way are plain strings written by [`crate::EngineSession`].

mod parser;

pub use parser::{parse_uci_message, UciMessage};

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    /// A line the session must not skip (an unreadable `bestmove`).
    #[error("unreadable engine line: {0}")]
    MalformedMessage(String),
    #[error("unrecognised engine line: {0}")]
    UnknownMessage(String),
    #[error(transparent)]
    InvalidMove(#[from] chess::MoveError),
}

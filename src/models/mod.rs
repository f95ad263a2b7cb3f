pub mod command;
pub mod position;

pub use command::Command;
pub use position::{DocumentId, Match, Position, Posting};

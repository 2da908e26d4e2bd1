//! Chat command surface.
//!
//! Commands are plain messages in the target channel such as `!search_decoy`
//! or `!interval 120`. [`Command::parse`] recognises them and
//! [`CommandHandler`] runs them.

mod handler;
mod parser;

pub use handler::{CommandHandler, INTERVAL_RANGE};
pub use parser::Command;

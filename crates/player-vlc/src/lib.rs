pub mod parser;
pub mod vlc;

pub use parser::{parse_playlist, parse_status};
pub use vlc::*;

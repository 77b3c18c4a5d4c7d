pub mod models;
pub mod parser;
pub mod spotify;

pub use parser::*;
pub use spotify::*;

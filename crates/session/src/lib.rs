pub mod backends;
pub mod controller;
pub mod session;

pub use backends::create_backend;
pub use controller::*;
pub use session::*;

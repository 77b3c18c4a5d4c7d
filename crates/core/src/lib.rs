pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod search;
pub mod timestamp;
pub mod traits;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::*;
pub use errors::*;
pub use events::*;
pub use models::*;
pub use search::*;
pub use timestamp::*;
pub use traits::*;
pub use transport::*;

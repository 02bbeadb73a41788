pub mod config;
pub mod error;
pub mod event;
pub mod patch;

pub use config::Config;
pub use error::*;
pub use event::*;
pub use patch::*;

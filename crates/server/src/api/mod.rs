//! Route handlers.

mod health;
mod validate;


pub use health::health;
pub use validate::validate;

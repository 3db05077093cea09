//! Request handlers.

pub mod analysis;
pub mod callbacks;
pub mod clips;
pub mod health;

pub use health::*;

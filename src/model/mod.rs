//! Plain data: integration state records and the entity container that holds them.

pub mod entity;
pub mod state;

pub use entity::*;
pub use state::*;

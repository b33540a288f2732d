//! Domain models backed by database rows.

mod user;

pub use user::{User, UserView};

//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every statement is bracketed by lifecycle events so attachment files follow
//! the rows that reference them.

pub mod user;

pub use user::UserRepository;

//! `SeaORM` entities.

pub mod users;

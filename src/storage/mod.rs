//! Durable user storage

pub mod users;

pub use users::{Registration, Role, UserRecord, UserStore};

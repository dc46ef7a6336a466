//! Database connection, changelog loading and migrations

pub mod changelog;
pub mod connection;
pub mod migrations;

pub use changelog::*;
pub use connection::*;
pub use migrations::*;

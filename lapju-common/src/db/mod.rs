//! Database models and queries

pub mod init;
pub mod models;
pub mod progress;
pub mod projects;
pub mod settings;
pub mod tasks;
pub mod templates;

pub use init::*;
pub use models::*;

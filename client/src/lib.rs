//! Terminal front end for the streaming chat backend.

pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod terminal;
pub mod transcript;
pub mod validation;

pub use app::App;
pub use config::{CliArgs, ClientConfig};
pub use error::AppError;

pub mod cli;
pub mod cli_handlers;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod store;

pub use config::Config;
pub use error::{Result, StoreError};
pub use models::*;
pub use password::PasswordHashing;
pub use store::RecordStore;

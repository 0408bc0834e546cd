pub mod config;
pub mod error;

pub use config::MedichatConfig;
pub use error::{MedichatError, Result};

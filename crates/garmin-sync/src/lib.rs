pub mod cli;
pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod models;

pub use error::{GarminError, Result};

pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod staging;

pub use error::{Error, Result};

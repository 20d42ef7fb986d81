mod client;
mod types;

pub use client::{GeminiClient, InferenceGateway};
pub use types::*;

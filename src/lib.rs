pub mod config;
pub mod diagram;
pub mod document;
pub mod error;
pub mod metrics;
pub mod wasm;

pub use config::EngineConfig;
pub use error::{EngineError, Phase};

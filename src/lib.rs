pub mod ai_provider;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod logging;
pub mod scanner;
pub mod transcribe;

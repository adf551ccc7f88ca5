pub mod args;
pub mod environment;
pub mod run_config;
pub mod settings;

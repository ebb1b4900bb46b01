pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod paths;
pub mod prompt;
pub mod provider;
pub mod relay;
pub mod render;
pub mod server;
pub mod store;

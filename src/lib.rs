pub mod cache;
pub mod config;
pub mod export;
pub mod history;
pub mod mirror;
pub mod scoring;
pub mod server;
pub mod session;
pub mod signal;
pub mod state;
pub mod stats;
pub mod store;
pub mod transition;
pub mod types;

#[cfg(test)]
mod tests;

//! Tag Claimer - Gamertag Reservation and Claiming Tool
//!
//! This tool reserves and claims gamertags against the Xbox Live identity
//! service using pools of bearer tokens and HTTP proxies. Each target
//! gamertag gets its own retry loop that draws a random token/proxy pair
//! per attempt until the reservation succeeds or the attempt cap runs out.

pub mod claimer;
pub mod loader;
pub mod proxy;
pub mod webhook;

pub use claimer::{ClaimClient, ClientConfig, Dispatcher, Outcome, WorkerConfig};
pub use proxy::{Proxy, ProxyAuth, ProxyParser};
pub use webhook::Notifier;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the line-delimited proxy pool file
    pub proxies_file: String,
    /// Path to the line-delimited token pool file
    pub tokens_file: String,
    /// Path to the line-delimited target gamertag file
    pub gamertags_file: String,
    /// Discord webhook URL for outcome notifications
    pub webhook_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxies_file: "proxies.txt".to_string(),
            tokens_file: "tokens.txt".to_string(),
            gamertags_file: "gamertags.txt".to_string(),
            webhook_url: String::new(),
        }
    }
}

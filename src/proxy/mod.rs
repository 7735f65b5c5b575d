//! Proxy module for parsing outbound proxy pool entries
//!
//! This module provides functionality for:
//! - Parsing proxy pool lines (USER:PASS@HOST:PORT, HOST:PORT, scheme:// URLs)
//! - Building proxy URLs with embedded credentials for the HTTP client

pub mod models;
pub mod parser;

pub use models::{Proxy, ProxyAuth, ProxyType};
pub use parser::ProxyParser;

//! Claimer module for reserving and claiming gamertags
//!
//! This module provides functionality for:
//! - Issuing reserve and claim requests against the identity service
//! - Running the per-gamertag retry loop with random token/proxy draws
//! - Dispatching targets across a bounded worker pool

pub mod client;
pub mod worker;

pub use client::{ClaimClient, ClientConfig};
pub use worker::{Dispatcher, Outcome, WorkerConfig};

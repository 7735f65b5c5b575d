//! Per-gamertag retry loop and bounded dispatcher

use crate::claimer::client::ClaimClient;
use crate::proxy::{Proxy, ProxyParser};
use crate::webhook::Notifier;
use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Default maximum reserve attempts per gamertag
const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Default number of gamertags processed concurrently
const DEFAULT_CONCURRENCY: usize = 10;

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum reserve attempts per gamertag
    pub max_attempts: u32,
    /// Number of gamertags processed concurrently
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Terminal state of one gamertag's retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Reserved and claimed
    Claimed,
    /// Reserved, but the single claim attempt failed; never retried
    ClaimFailed,
    /// Attempt cap reached without a reservation
    Exhausted,
}

impl Outcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, Outcome::Claimed)
    }
}

/// Dispatcher running one retry loop per target gamertag
///
/// Token and proxy pools are read-only after load and shared across
/// workers; each attempt draws from them uniformly at random with
/// replacement. Targets run across a bounded pool rather than one
/// unbounded thread each.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: ClaimClient,
    notifier: Notifier,
    tokens: Arc<Vec<String>>,
    proxies: Arc<Vec<String>>,
    config: WorkerConfig,
}

impl Dispatcher {
    pub fn new(
        client: ClaimClient,
        notifier: Notifier,
        tokens: Vec<String>,
        proxies: Vec<String>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            client,
            notifier,
            tokens: Arc::new(tokens),
            proxies: Arc::new(proxies),
            config,
        }
    }

    /// Run every target to its terminal outcome and collect the results.
    ///
    /// All workers complete before this returns; a single target's
    /// permanent failure never affects the others.
    pub async fn run(&self, gamertags: Vec<String>) -> Vec<(String, Outcome)> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        stream::iter(gamertags)
            .map(|gamertag| {
                let sem = Arc::clone(&semaphore);
                let worker = self.clone();
                async move {
                    // Semaphore acquire only fails if the semaphore is closed,
                    // which won't happen here since we own the Arc and keep it
                    // alive for the duration of the run.
                    let _permit = sem.acquire().await.expect("Semaphore closed unexpectedly");
                    let outcome = worker.process(&gamertag).await;
                    (gamertag, outcome)
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await
    }

    /// Retry loop for a single gamertag.
    ///
    /// Draws a fresh token/proxy pair per attempt with no backoff. On a
    /// successful reservation, Claim runs exactly once with the same pair
    /// and the loop terminates regardless of the claim outcome. Cap
    /// exhaustion is logged but sends no notification.
    async fn process(&self, gamertag: &str) -> Outcome {
        let mut attempt: u32 = 0;

        while attempt < self.config.max_attempts {
            let (token, proxy_line) = self.draw();

            let Some(token) = token else {
                error!(gamertag, "token pool is empty, cannot reserve");
                return Outcome::Exhausted;
            };

            let proxy: Option<Proxy> = match proxy_line.as_deref() {
                Some(line) => match ProxyParser::parse_line(line) {
                    Some(proxy) => Some(proxy),
                    None => {
                        warn!(gamertag, entry = line, "skipping malformed proxy entry");
                        attempt += 1;
                        continue;
                    }
                },
                None => None,
            };

            if let Some(proxy) = proxy.as_ref() {
                debug!(gamertag, attempt, proxy = %proxy, "attempting reservation through proxy");
            }

            if self.client.reserve(gamertag, &token, proxy.as_ref()).await {
                return if self.client.claim(gamertag, &token, proxy.as_ref()).await {
                    self.notifier
                        .notify(
                            &format!("Successfully claimed gamertag: {gamertag}"),
                            gamertag,
                            true,
                        )
                        .await;
                    Outcome::Claimed
                } else {
                    self.notifier
                        .notify(
                            &format!("Failed to claim gamertag after reservation: {gamertag}"),
                            gamertag,
                            false,
                        )
                        .await;
                    Outcome::ClaimFailed
                };
            }

            attempt += 1;
            debug!(gamertag, attempt, "reservation attempt failed, retrying");
        }

        error!(
            gamertag,
            max_attempts = self.config.max_attempts,
            "maximum attempts reached, failed to reserve gamertag"
        );
        Outcome::Exhausted
    }

    /// Draw a token and a raw proxy line uniformly at random, with
    /// replacement. An empty proxy pool yields no proxy.
    fn draw(&self) -> (Option<String>, Option<String>) {
        let mut rng = rand::thread_rng();
        let token = self.tokens.choose(&mut rng).cloned();
        let proxy = self.proxies.choose(&mut rng).cloned();
        (token, proxy)
    }
}

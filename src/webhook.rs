//! Outcome notifications via Discord webhook

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

const COLOR_SUCCESS: u32 = 0x00ff00;
const COLOR_FAILURE: u32 = 0xff0000;

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

/// Best-effort webhook notifier for terminal outcomes
///
/// Delivery failures are logged and never abort the calling worker.
#[derive(Debug, Clone)]
pub struct Notifier {
    url: String,
    client: Client,
}

impl Notifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }

    /// Send one embed: green on success, red on failure, with the
    /// gamertag as a labeled field.
    pub async fn notify(&self, message: &str, gamertag: &str, success: bool) {
        let payload = WebhookPayload {
            embeds: vec![Embed {
                description: message.to_string(),
                color: if success { COLOR_SUCCESS } else { COLOR_FAILURE },
                fields: vec![EmbedField {
                    name: "Gamertag".to_string(),
                    value: gamertag.to_string(),
                    inline: false,
                }],
            }],
        };

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(gamertag, "webhook notification delivered");
            }
            Ok(response) => {
                warn!(gamertag, status = %response.status(), "webhook delivery rejected");
            }
            Err(e) => {
                warn!(gamertag, error = %e, "webhook delivery failed");
            }
        }
    }
}
